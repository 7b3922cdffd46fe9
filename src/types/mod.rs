//! Type definitions for the report engine

mod aggregates;
mod error;
mod filters;
mod records;
mod status;

pub use aggregates::*;
pub use error::*;
pub use filters::*;
pub use records::*;
pub use status::*;
