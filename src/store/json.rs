//! File-backed store: one `<table>.json` array per collection

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::rows::{parse_timestamp, scalar_text};
use super::{Collection, Predicate, Query, ReportStore};
use crate::types::{ReportError, Result};

/// In-memory store loaded from a directory of JSON exports.
///
/// Predicates are evaluated locally. A range predicate never matches a row
/// whose column is missing or not a timestamp.
pub struct JsonStore {
    source: String,
    tables: HashMap<Collection, Vec<Value>>,
}

impl JsonStore {
    /// Load every `*.json` file in `dir` whose stem names a known table
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ReportError::Config(format!(
                "data directory not found: {}",
                dir.display()
            )));
        }

        let mut tables = HashMap::new();
        for path in Self::collect_files(dir) {
            let Some(collection) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(Collection::from_table)
            else {
                log::debug!("ignoring unknown table file {:?}", path);
                continue;
            };
            tables.insert(collection, Self::load_file(&path)?);
        }

        Ok(Self {
            source: dir.display().to_string(),
            tables,
        })
    }

    /// Build a store from already-parsed rows
    pub fn from_tables(tables: HashMap<Collection, Vec<Value>>) -> Self {
        Self {
            source: "memory".into(),
            tables,
        }
    }

    fn collect_files(dir: &Path) -> Vec<PathBuf> {
        let pattern = dir.join("*.json");
        glob::glob(&pattern.to_string_lossy())
            .map(|paths| paths.filter_map(|e| e.ok()).collect())
            .unwrap_or_default()
    }

    fn load_file(path: &Path) -> Result<Vec<Value>> {
        let mut bytes = std::fs::read(path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        simd_json::from_slice::<Vec<Value>>(&mut bytes)
            .map_err(|e| ReportError::Parse(format!("{}: {}", path.display(), e)))
    }

    fn matches(row: &Value, predicate: &Predicate) -> bool {
        let field = row.get(predicate.column());
        match predicate {
            Predicate::Eq(_, expected) => {
                field.and_then(scalar_text).as_deref() == Some(expected.as_str())
            }
            Predicate::Gte(_, bound) => Self::timestamp(field).is_some_and(|ts| ts >= *bound),
            Predicate::Lte(_, bound) => Self::timestamp(field).is_some_and(|ts| ts <= *bound),
            Predicate::In(_, values) => {
                let set: HashSet<&str> = values.iter().map(String::as_str).collect();
                field
                    .and_then(scalar_text)
                    .is_some_and(|text| set.contains(text.as_str()))
            }
        }
    }

    fn timestamp(field: Option<&Value>) -> Option<chrono::DateTime<chrono::Utc>> {
        field.and_then(Value::as_str).and_then(parse_timestamp)
    }
}

#[async_trait]
impl ReportStore for JsonStore {
    fn name(&self) -> &str {
        &self.source
    }

    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
        let Some(rows) = self.tables.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|row| query.predicates().iter().all(|p| Self::matches(row, p)))
            .cloned()
            .collect())
    }
}
