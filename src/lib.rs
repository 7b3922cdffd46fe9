//! Report aggregation engine for donation, request, inventory and movement
//! records.

pub mod cli;
pub mod config;
pub mod services;
pub mod store;
pub mod types;
