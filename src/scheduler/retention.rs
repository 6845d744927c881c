//! Retention manager for cleaning up old probe records.

use crate::db::Store;

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Manager for deleting probe records past the retention period.
pub struct RetentionManager {
    store: Arc<Store>,
    retention_secs: i64,
    stop: Arc<Mutex<Option<tokio::sync::broadcast::Sender<()>>>>,
}

impl RetentionManager {
    pub fn new(store: Arc<Store>, retention_secs: i64) -> Self {
        Self {
            store,
            retention_secs,
            stop: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the retention manager background task.
    pub fn start(&self) {
        let store = self.store.clone();
        let stop = self.stop.clone();
        let retention_secs = self.retention_secs;

        tokio::spawn(async move {
            let (tx, _) = tokio::sync::broadcast::channel(1);
            {
                let mut stop_guard = stop.lock().await;
                *stop_guard = Some(tx.clone());
            }

            let mut rx = tx.subscribe();
            let mut interval = tokio::time::interval(Duration::from_secs(60));

            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = interval.tick() => {
                        process_retention(&store, retention_secs);
                    }
                }
            }
        });
    }

    /// Stop the retention manager.
    pub async fn stop(&self) {
        let stop = self.stop.lock().await;
        if let Some(tx) = stop.as_ref() {
            let _ = tx.send(());
        }
    }
}

fn process_retention(store: &Store, retention_secs: i64) {
    let cutoff = match ChronoDuration::try_seconds(retention_secs)
        .and_then(|retention| Utc::now().checked_sub_signed(retention))
    {
        Some(cutoff) => cutoff,
        None => {
            tracing::debug!(
                "RetentionManager: Retention of {}s reaches past the earliest time, nothing to prune",
                retention_secs
            );
            return;
        }
    };

    match store.delete_probe_records_before(cutoff) {
        Ok(0) => {}
        Ok(deleted) => {
            tracing::info!("RetentionManager: Deleted {} probe records before {}", deleted, cutoff);
        }
        Err(e) => {
            tracing::error!("RetentionManager: Failed to delete probe records: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProbeRecord;
    use tempfile::NamedTempFile;

    #[test]
    fn test_process_retention_prunes_old_records() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let now = Utc::now();

        store
            .add_probe_records(&[
                ProbeRecord::success(now - ChronoDuration::hours(3), "a", 1.0),
                ProbeRecord::success(now - ChronoDuration::minutes(5), "a", 1.0),
                ProbeRecord::failure(now, "a"),
            ])
            .unwrap();

        process_retention(&store, 3600);

        let remaining = store.get_recent_probe_records(10).unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn test_process_retention_with_huge_period_keeps_everything() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let old = Utc::now() - ChronoDuration::days(3650);
        store.add_probe_records(&[ProbeRecord::failure(old, "a")]).unwrap();

        process_retention(&store, i64::MAX);
        process_retention(&store, 9_000_000_000_000);

        assert_eq!(store.get_record_stats().unwrap().count, 1);
    }
}
