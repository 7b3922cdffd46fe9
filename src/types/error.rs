use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Entity types fetched independently by a report session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Inventory,
    Donations,
    Requests,
    Movements,
    Deposits,
}

impl Entity {
    pub const ALL: [Entity; 5] = [
        Entity::Inventory,
        Entity::Donations,
        Entity::Requests,
        Entity::Movements,
        Entity::Deposits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Inventory => "inventory",
            Entity::Donations => "donations",
            Entity::Requests => "requests",
            Entity::Movements => "movements",
            Entity::Deposits => "deposits",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record fetch failed for one entity type.
///
/// Cloneable so a session snapshot can keep it next to the data of the
/// entities that did load.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("failed to fetch {entity}: {message}")]
pub struct FetchError {
    pub entity: Entity,
    pub message: String,
}

impl FetchError {
    pub fn new(entity: Entity, message: impl Into<String>) -> Self {
        Self {
            entity,
            message: message.into(),
        }
    }
}

/// Report engine error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// A record fetcher failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Backing store rejected or failed a query
    #[error("store error: {0}")]
    Store(String),

    /// Failed to parse JSON or a date value
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Export failed
    #[error("export error: {0}")]
    Export(String),
}

/// Result type alias for the report engine
pub type Result<T> = std::result::Result<T, ReportError>;

/// A foreign identifier with no match in its lookup collection.
///
/// Not an error: the record keeps its place and carries a fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolutionGap {
    pub entity: Entity,
    pub id: String,
}

/// A derived invariant that upstream data violated (e.g. more fulfilled
/// than requested in one period). Logged, never raised.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationInconsistency {
    pub period: String,
    pub requested: f64,
    pub fulfilled: f64,
}

impl fmt::Display for AggregationInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "period {}: fulfilled {} exceeds requested {}",
            self.period, self.fulfilled, self.requested
        )
    }
}
