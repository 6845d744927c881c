//! Scheduler module for ingesting probe records and refreshing status.

mod refresh;
mod retention;

pub use refresh::*;
pub use retention::*;

use crate::db::{ProbeRecord, Store};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Records buffered before a flush is forced.
const FLUSH_BATCH_SIZE: usize = 500;

/// Ingest error types.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("ingest channel closed")]
    Closed,
}

/// Orchestrates the background tasks: batch writing, refresh and retention.
pub struct Scheduler {
    /// Taken on stop so the writer sees the channel close.
    record_tx: Mutex<Option<mpsc::Sender<ProbeRecord>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    refresher: Arc<Refresher>,
    retention_manager: Arc<RetentionManager>,
}

impl Scheduler {
    /// Create a new scheduler writing ingested records to the given store.
    pub fn new(store: Arc<Store>, refresher: Arc<Refresher>, retention_secs: i64) -> Self {
        let (tx, rx) = mpsc::channel(1000);

        let retention_manager = Arc::new(RetentionManager::new(store.clone(), retention_secs));

        // Start batch writer in a separate task
        let writer = tokio::spawn(run_batch_writer(rx, store));

        Self {
            record_tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
            refresher,
            retention_manager,
        }
    }

    /// Start the refresh and retention tasks.
    pub fn start(&self) {
        self.refresher.start();
        self.retention_manager.start();
    }

    pub fn refresher(&self) -> &Arc<Refresher> {
        &self.refresher
    }

    /// Queue probe records for storage.
    pub async fn ingest(&self, records: Vec<ProbeRecord>) -> Result<(), IngestError> {
        let tx = self
            .record_tx
            .lock()
            .await
            .clone()
            .ok_or(IngestError::Closed)?;

        for record in records {
            tx.send(record).await.map_err(|_| IngestError::Closed)?;
        }
        Ok(())
    }

    /// Stop background tasks, flushing every record already accepted.
    pub async fn stop(&self) {
        self.refresher.stop();
        self.retention_manager.stop().await;

        // Closing the channel makes the writer flush and exit
        drop(self.record_tx.lock().await.take());

        if let Some(writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.await {
                tracing::error!("Batch writer ended abnormally: {}", e);
            }
        }
    }
}

/// Run the batch writer that accumulates and flushes probe records.
async fn run_batch_writer(mut rx: mpsc::Receiver<ProbeRecord>, store: Arc<Store>) {
    let mut buffer: Vec<ProbeRecord> = Vec::with_capacity(100);
    let mut interval = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Some(r) => {
                        buffer.push(r);
                        if buffer.len() >= FLUSH_BATCH_SIZE {
                            flush_buffer(&store, &mut buffer);
                        }
                    }
                    None => {
                        // Channel closed, flush remaining and exit
                        flush_buffer(&store, &mut buffer);
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                flush_buffer(&store, &mut buffer);
            }
        }
    }
}

fn flush_buffer(store: &Store, buffer: &mut Vec<ProbeRecord>) {
    if buffer.is_empty() {
        return;
    }

    if let Err(e) = store.add_probe_records(buffer) {
        tracing::error!("Failed to flush {} probe records: {}", buffer.len(), e);
    }

    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StoreSource;
    use crate::status::Classifier;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_batch_writer_flushes_on_close() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let (tx, rx) = mpsc::channel(16);

        let writer = tokio::spawn(run_batch_writer(rx, store.clone()));
        for i in 0..5 {
            tx.send(ProbeRecord::success(Utc::now(), "a", i as f64))
                .await
                .unwrap();
        }
        drop(tx);
        writer.await.unwrap();

        assert_eq!(store.get_recent_probe_records(100).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_stop_persists_accepted_records() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let source = Arc::new(StoreSource::new(store.clone(), "test.db"));
        let refresher = Arc::new(Refresher::new(
            source,
            Classifier::default(),
            1000,
            Duration::from_secs(60),
        ));
        let scheduler = Scheduler::new(store.clone(), refresher, 3600);
        scheduler.start();

        scheduler
            .ingest(vec![
                ProbeRecord::success(Utc::now(), "a", 10.0),
                ProbeRecord::success(Utc::now(), "a", 20.0),
                ProbeRecord::failure(Utc::now(), "b"),
            ])
            .await
            .unwrap();
        scheduler.stop().await;

        assert_eq!(store.get_record_stats().unwrap().count, 3);

        // The channel is closed once stopped
        let late = scheduler
            .ingest(vec![ProbeRecord::failure(Utc::now(), "a")])
            .await;
        assert!(matches!(late, Err(IngestError::Closed)));
    }

    #[test]
    fn test_flush_buffer_clears() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let mut buffer = vec![ProbeRecord::failure(Utc::now(), "a")];

        flush_buffer(&store, &mut buffer);
        assert!(buffer.is_empty());
        assert_eq!(store.get_record_stats().unwrap().count, 1);

        // Flushing an empty buffer is a no-op
        flush_buffer(&store, &mut buffer);
        assert_eq!(store.get_record_stats().unwrap().count, 1);
    }
}
