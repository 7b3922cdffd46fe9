//! Cross-reference resolution of foreign identifiers to display names
//!
//! Names are looked up in a map built from one batched fetch. An id with no
//! match gets the fallback label and is reported as a [`ResolutionGap`];
//! the record itself is always kept.

use std::collections::{HashMap, HashSet};

use crate::types::{Entity, ResolutionGap};

/// Identifier → display name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    names: HashMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NameMap::new();
        for (id, name) in iter {
            map.insert(id, name);
        }
        map
    }
}

/// Records annotated with display names, plus the ids that had no match
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub records: Vec<T>,
    pub gaps: Vec<ResolutionGap>,
}

/// Distinct non-empty ids referenced by `records`, in first-seen order
pub fn distinct_ids<'a, T, F, I>(records: &'a [T], ids_of: F) -> Vec<String>
where
    F: Fn(&'a T) -> I,
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ids = Vec::new();
    for record in records {
        for id in ids_of(record).into_iter().flatten() {
            if !id.is_empty() && seen.insert(id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Annotate each record with the name of the id returned by `id_of`.
///
/// Missing ids and ids absent from `names` both receive `fallback`; only the
/// latter are reported as gaps (once per distinct id). Never drops records.
pub fn resolve<T, G, S>(
    records: Vec<T>,
    entity: Entity,
    id_of: G,
    assign: S,
    names: &NameMap,
    fallback: &str,
) -> Resolution<T>
where
    G: Fn(&T) -> Option<&str>,
    S: Fn(&mut T, String),
{
    let mut gaps = Vec::new();
    let mut gap_ids: HashSet<String> = HashSet::new();
    let mut resolved = Vec::with_capacity(records.len());

    for mut record in records {
        let name = match id_of(&record) {
            Some(id) => match names.get(id) {
                Some(name) => name.to_string(),
                None => {
                    if gap_ids.insert(id.to_string()) {
                        gaps.push(ResolutionGap {
                            entity,
                            id: id.to_string(),
                        });
                    }
                    fallback.to_string()
                }
            },
            None => fallback.to_string(),
        };
        assign(&mut record, name);
        resolved.push(record);
    }

    if !gaps.is_empty() {
        log::debug!(
            "{}: {} unresolved reference(s), using \"{}\"",
            entity,
            gaps.len(),
            fallback
        );
    }

    Resolution {
        records: resolved,
        gaps,
    }
}
