//! Store-backed probe source.

use std::sync::Arc;

use super::{ProbeSource, Snapshot, SourceError};
use crate::db::Store;

/// Reads probe records and configured endpoints from the SQLite store.
pub struct StoreSource {
    store: Arc<Store>,
    description: String,
}

impl StoreSource {
    pub fn new(store: Arc<Store>, db_path: &str) -> Self {
        Self {
            store,
            description: format!("sqlite: {}", db_path),
        }
    }
}

impl ProbeSource for StoreSource {
    fn fetch_snapshot(&self, limit: usize) -> Result<Snapshot, SourceError> {
        let records = self.store.get_recent_probe_records(limit)?;
        let configured = self
            .store
            .get_endpoints()?
            .into_iter()
            .map(|e| e.name)
            .collect();
        Ok(Snapshot { records, configured })
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProbeRecord;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    #[test]
    fn test_store_source_snapshot() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        store.add_endpoint("a").unwrap();
        store
            .add_probe_records(&[
                ProbeRecord::success(Utc::now(), "a", 10.0),
                ProbeRecord::failure(Utc::now(), "b"),
            ])
            .unwrap();

        let source = StoreSource::new(store, "test.db");
        assert_eq!(source.description(), "sqlite: test.db");

        let snapshot = source.fetch_snapshot(1000).unwrap();
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.configured.len(), 1);
        assert!(snapshot.configured.contains("a"));

        let limited = source.fetch_snapshot(1).unwrap();
        assert_eq!(limited.records.len(), 1);
    }
}
