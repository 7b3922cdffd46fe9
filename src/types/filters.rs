use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel value the presentation layer sends for "no filter"
const ALL: &str = "all";

/// Filter parameters of a report session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    /// Inclusive lower bound on each record's primary timestamp
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on each record's primary timestamp
    pub date_to: Option<DateTime<Utc>>,
    pub deposit_id: Option<String>,
    pub user_category: Option<String>,
    pub status: Option<String>,
}

impl ReportFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_deposit(mut self, deposit_id: impl Into<String>) -> Self {
        self.deposit_id = Some(deposit_id.into());
        self
    }

    pub fn with_user_category(mut self, category: impl Into<String>) -> Self {
        self.user_category = Some(category.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Deposit filter, ignoring empty values
    pub fn deposit(&self) -> Option<&str> {
        active(self.deposit_id.as_deref())
    }

    /// User category filter, ignoring empty values and "all"
    pub fn category(&self) -> Option<&str> {
        active(self.user_category.as_deref())
    }

    /// Request status filter, ignoring empty values and "all"
    pub fn status_filter(&self) -> Option<&str> {
        active(self.status.as_deref())
    }
}

fn active(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}
