//! Canonical status and transaction-type tables
//!
//! Stores carry free-text status values in more than one spelling
//! ("completado" and "atendido" both mean a fulfilled request). Every view
//! goes through these tables so equivalent spellings always land in the
//! same group.

use serde::{Deserialize, Serialize};
use std::fmt;

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

const UNKNOWN: &str = "unknown";

/// Lifecycle status of a food request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Pending,
    Fulfilled,
    Rejected,
    Cancelled,
    /// Missing or blank status
    Unknown,
    Other(String),
}

impl RequestStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "pendiente" | "pending" => RequestStatus::Pending,
            "completado" | "atendido" | "completed" | "fulfilled" => RequestStatus::Fulfilled,
            "rechazado" | "rejected" => RequestStatus::Rejected,
            "cancelado" | "cancelled" | "canceled" => RequestStatus::Cancelled,
            "" | UNKNOWN => RequestStatus::Unknown,
            _ => RequestStatus::Other(raw.trim().to_string()),
        }
    }

    /// Grouping key used by per-status aggregates
    pub fn key(&self) -> &str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Unknown => UNKNOWN,
            RequestStatus::Other(raw) => raw,
        }
    }

    /// Whether a status filter value selects this status. Unlisted values
    /// compare case-insensitively.
    pub fn matches(&self, filter: &str) -> bool {
        match (self, RequestStatus::parse(filter)) {
            (RequestStatus::Other(raw), RequestStatus::Other(wanted)) => {
                normalize(raw) == normalize(&wanted)
            }
            (status, wanted) => *status == wanted,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, RequestStatus::Fulfilled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl From<String> for RequestStatus {
    fn from(raw: String) -> Self {
        RequestStatus::parse(&raw)
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.key().to_string()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Status of an inventory movement header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MovementStatus {
    Pending,
    Completed,
    Donated,
    Unknown,
    Other(String),
}

impl MovementStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "pendiente" | "pending" => MovementStatus::Pending,
            "completado" | "completed" => MovementStatus::Completed,
            "donado" | "donated" => MovementStatus::Donated,
            "" | UNKNOWN => MovementStatus::Unknown,
            _ => MovementStatus::Other(raw.trim().to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Completed => "completed",
            MovementStatus::Donated => "donated",
            MovementStatus::Unknown => UNKNOWN,
            MovementStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for MovementStatus {
    fn from(raw: String) -> Self {
        MovementStatus::parse(&raw)
    }
}

impl From<MovementStatus> for String {
    fn from(status: MovementStatus) -> Self {
        status.key().to_string()
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Direction of a single movement detail line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Ingress,
    Egress,
    Writeoff,
    Unknown,
    Other(String),
}

impl TransactionType {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "ingreso" | "ingress" => TransactionType::Ingress,
            "egreso" | "egress" => TransactionType::Egress,
            "baja" | "writeoff" => TransactionType::Writeoff,
            "" | UNKNOWN => TransactionType::Unknown,
            _ => TransactionType::Other(raw.trim().to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            TransactionType::Ingress => "ingress",
            TransactionType::Egress => "egress",
            TransactionType::Writeoff => "writeoff",
            TransactionType::Unknown => UNKNOWN,
            TransactionType::Other(raw) => raw,
        }
    }
}

impl From<String> for TransactionType {
    fn from(raw: String) -> Self {
        TransactionType::parse(&raw)
    }
}

impl From<TransactionType> for String {
    fn from(kind: TransactionType) -> Self {
        kind.key().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
