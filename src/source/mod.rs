//! Probe data sources.
//!
//! A source hands the refresher a bounded snapshot of probe records plus
//! the set of endpoints that should be tracked. The status engine never
//! knows where the data came from.

mod mock;
mod store;

pub use mock::MockSource;
pub use store::StoreSource;

use crate::db::{DbError, ProbeRecord};

use std::collections::BTreeSet;
use thiserror::Error;

/// Source error types.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("store error: {0}")]
    Store(#[from] DbError),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// One fetch worth of input for the status engine.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<ProbeRecord>,
    /// Endpoints to report on. Empty means report everything observed.
    pub configured: BTreeSet<String>,
}

/// Trait for fetching probe snapshots from a backend.
pub trait ProbeSource: Send + Sync {
    /// Fetch at most `limit` of the most recent records and the configured
    /// endpoint set.
    fn fetch_snapshot(&self, limit: usize) -> Result<Snapshot, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
