//! Aggregate row types (derived, never persisted)

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// Abbreviated month names used in period labels ("ene 2024")
const MONTH_LABELS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Summed quantity and record count for one calendar day
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyQuantity {
    pub date: NaiveDate,
    pub quantity: f64,
    pub count: u64,
}

/// Summed quantity and record count for one grouping key
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct KeyedQuantity {
    pub key: String,
    pub quantity: f64,
    pub count: u64,
}

impl KeyedQuantity {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, quantity: f64) {
        self.quantity += quantity;
        self.count = self.count.saturating_add(1);
    }
}

/// Record count for one grouping key
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeyedCount {
    pub key: String,
    pub count: u64,
}

/// Movement counts for one calendar day
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovementDay {
    pub date: NaiveDate,
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
}

/// Calendar month used as the comparison period key.
///
/// Both sides of a comparison derive their period through
/// [`YearMonth::of`], so the same month can never split into two rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Sortable key, e.g. "2024-01"
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Display label, e.g. "ene 2024"
    pub fn label(&self) -> String {
        let idx = self.month.clamp(1, 12) as usize - 1;
        format!("{} {}", MONTH_LABELS[idx], self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

/// Donation vs request volume for one period
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparisonRow {
    pub period: YearMonth,
    pub label: String,
    pub donations: f64,
    pub requests: f64,
    pub fulfilled: f64,
}

impl ComparisonRow {
    pub fn empty(period: YearMonth) -> Self {
        Self {
            period,
            label: period.label(),
            donations: 0.0,
            requests: 0.0,
            fulfilled: 0.0,
        }
    }

    /// Requested minus fulfilled. Negative only for inconsistent upstream data.
    pub fn pending(&self) -> f64 {
        self.requests - self.fulfilled
    }

    pub fn efficiency(&self) -> u32 {
        efficiency(self.requests, self.fulfilled)
    }
}

/// Percentage of requested quantity that was fulfilled, rounded.
/// Zero when nothing was requested.
pub fn efficiency(requested: f64, fulfilled: f64) -> u32 {
    if requested > 0.0 {
        (100.0 * fulfilled / requested).round().max(0.0) as u32
    } else {
        0
    }
}

/// Totals across all comparison periods
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ComparisonSummary {
    pub donations: f64,
    pub requests: f64,
    pub fulfilled: f64,
    /// Rounded mean of per-period efficiencies
    pub mean_efficiency: u32,
}

/// Headline figures of the report
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Overview {
    pub total_inventory: f64,
    pub donation_count: u64,
    pub pending_requests: u64,
    pub active_users: u64,
}
