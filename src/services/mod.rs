//! Services for fetching, resolving, aggregating and exporting report data

pub mod aggregator;
pub mod comparison;
pub mod export;
pub mod fetcher;
pub mod resolver;
pub mod session;

pub use aggregator::Aggregator;
pub use comparison::ComparisonSynthesizer;
pub use export::{ExportFormat, Exporter, ReportType};
pub use fetcher::{FallbackLabels, RecordFetcher};
pub use resolver::{NameMap, Resolution};
pub use session::{FetchOutcome, FetchTicket, ReportSession, ReportSnapshot, SessionStatus};
