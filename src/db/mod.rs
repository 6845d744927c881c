//! Database module for PulseTrail.
//!
//! Provides SQLite storage for configured endpoints and probe records.

mod models;
mod store;

pub use models::*;
pub use store::*;
