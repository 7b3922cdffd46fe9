//! Predicate queries understood by every store backend

use chrono::{DateTime, Utc};

/// A single filter on one column
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column equals the value (compared as text)
    Eq(&'static str, String),
    /// Column timestamp is at or after the bound
    Gte(&'static str, DateTime<Utc>),
    /// Column timestamp is at or before the bound
    Lte(&'static str, DateTime<Utc>),
    /// Column is one of the values
    In(&'static str, Vec<String>),
}

impl Predicate {
    pub fn column(&self) -> &'static str {
        match self {
            Predicate::Eq(c, _)
            | Predicate::Gte(c, _)
            | Predicate::Lte(c, _)
            | Predicate::In(c, _) => *c,
        }
    }
}

/// Conjunction of predicates against one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    predicates: Vec<Predicate>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq(column, value.into()));
        self
    }

    pub fn gte(mut self, column: &'static str, bound: DateTime<Utc>) -> Self {
        self.predicates.push(Predicate::Gte(column, bound));
        self
    }

    pub fn lte(mut self, column: &'static str, bound: DateTime<Utc>) -> Self {
        self.predicates.push(Predicate::Lte(column, bound));
        self
    }

    pub fn is_in<I, S>(mut self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predicates
            .push(Predicate::In(column, values.into_iter().map(Into::into).collect()));
        self
    }

    /// Inclusive range on a timestamp column; absent bounds add nothing
    pub fn date_range(
        self,
        column: &'static str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        let query = match from {
            Some(from) => self.gte(column, from),
            None => self,
        };
        match to {
            Some(to) => query.lte(column, to),
            None => query,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_range_both_bounds() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let query = Query::new().date_range("created_at", Some(from), Some(to));

        assert_eq!(
            query.predicates(),
            &[
                Predicate::Gte("created_at", from),
                Predicate::Lte("created_at", to)
            ]
        );
    }

    #[test]
    fn test_date_range_no_bounds_is_empty() {
        let query = Query::new().date_range("created_at", None, None);
        assert!(query.is_empty());
    }

    #[test]
    fn test_is_in_collects_values() {
        let query = Query::new().is_in("id", ["a", "b"]);
        assert_eq!(
            query.predicates(),
            &[Predicate::In("id", vec!["a".to_string(), "b".to_string()])]
        );
        assert_eq!(query.predicates()[0].column(), "id");
    }
}
