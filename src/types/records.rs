//! Resolved record types produced by the fetchers

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::{MovementStatus, RequestStatus, TransactionType};

/// A donated product, with the donor's display name resolved
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DonationRecord {
    pub product_id: String,
    pub donor_id: Option<String>,
    pub product_name: String,
    pub description: Option<String>,
    /// Records without a parseable donation date are kept but never
    /// bucketed by date
    pub donated_at: Option<DateTime<Utc>>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub donor_name: String,
}

impl DonationRecord {
    pub fn quantity_or_zero(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    /// Classify the expiry date relative to `today`.
    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        match self.expires_at {
            Some(expires_at) => ExpiryStatus::classify(expires_at, today),
            None => ExpiryStatus::NoExpiry,
        }
    }
}

/// A food request, with the requester's display name resolved
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RequestRecord {
    pub id: String,
    pub requester_id: Option<String>,
    pub food_type: String,
    pub quantity: Option<f64>,
    pub comments: Option<String>,
    pub status: RequestStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub requester_name: String,
}

impl RequestRecord {
    pub fn quantity_or_zero(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }
}

/// Current stock of one product in one deposit
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InventorySnapshot {
    pub id: String,
    /// Never negative; negative store values are clamped to zero on load
    pub available: f64,
    pub deposit_id: Option<String>,
    pub deposit_name: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventorySnapshot {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.available)
    }
}

/// Inventory movement header with its detail lines
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovementRecord {
    pub id: String,
    pub moved_at: Option<DateTime<Utc>>,
    pub status: MovementStatus,
    pub donor_id: Option<String>,
    pub requester_id: Option<String>,
    pub donor_name: String,
    pub requester_name: String,
    pub notes: Option<String>,
    pub details: Vec<MovementDetail>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovementDetail {
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: Option<f64>,
    pub transaction_type: TransactionType,
    pub actor_role: Option<String>,
}

impl MovementDetail {
    pub fn quantity_or_zero(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }
}

/// Deposit catalogue entry (used for filter choices)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Deposit {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Low,
    Medium,
    High,
}

impl StockLevel {
    pub fn classify(available: f64) -> Self {
        if available <= 0.0 {
            StockLevel::OutOfStock
        } else if available <= 10.0 {
            StockLevel::Low
        } else if available <= 50.0 {
            StockLevel::Medium
        } else {
            StockLevel::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    NoExpiry,
    Expired,
    ExpiresSoon,
    Expiring,
    Fresh,
}

impl ExpiryStatus {
    /// Days left are the ceiling of the remaining time, measured from the
    /// start of `today` (UTC).
    pub fn classify(expires_at: DateTime<Utc>, today: NaiveDate) -> Self {
        let start_of_day = today
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(expires_at);
        let remaining_secs = (expires_at - start_of_day).num_seconds();
        let days_left = remaining_secs.div_euclid(86_400)
            + i64::from(remaining_secs.rem_euclid(86_400) != 0);

        if days_left < 0 {
            ExpiryStatus::Expired
        } else if days_left <= 7 {
            ExpiryStatus::ExpiresSoon
        } else if days_left <= 30 {
            ExpiryStatus::Expiring
        } else {
            ExpiryStatus::Fresh
        }
    }
}
