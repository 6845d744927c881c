//! Periodic status refresh.

use crate::source::{ProbeSource, SourceError};
use crate::status::{aggregate, Classifier, EndpointSummary};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// The latest published status for all endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// When the summaries were computed. `None` before the first success.
    pub generated_at: Option<DateTime<Utc>>,
    pub source: String,
    pub high_latency_ms: f64,
    pub summaries: Vec<EndpointSummary>,
    /// Error from the most recent fetch, if it failed.
    pub source_error: Option<String>,
}

/// Fetches snapshots from a source and republishes aggregated status.
pub struct Refresher {
    source: Arc<dyn ProbeSource>,
    classifier: Classifier,
    lookback_limit: usize,
    interval: Duration,
    report: Arc<RwLock<StatusReport>>,
    stop_tx: broadcast::Sender<()>,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn ProbeSource>,
        classifier: Classifier,
        lookback_limit: usize,
        interval: Duration,
    ) -> Self {
        let report = StatusReport {
            source: source.description().to_string(),
            high_latency_ms: classifier.high_latency_ms(),
            ..Default::default()
        };
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            source,
            classifier,
            lookback_limit,
            interval,
            report: Arc::new(RwLock::new(report)),
            stop_tx,
        }
    }

    /// Start the refresh background task.
    pub fn start(self: &Arc<Self>) {
        let this = self.clone();
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = interval.tick() => {
                        this.refresh_once().await;
                    }
                }
            }
        });
    }

    /// Stop the refresh background task.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Fetch one snapshot and publish the resulting summaries.
    ///
    /// A failed fetch keeps the previous summaries and records the error.
    pub async fn refresh_once(&self) {
        let source = self.source.clone();
        let classifier = self.classifier;
        let limit = self.lookback_limit;

        let result = tokio::task::spawn_blocking(move || {
            let snapshot = source.fetch_snapshot(limit)?;
            let summaries = aggregate(&snapshot.records, &snapshot.configured, &classifier);
            Ok::<_, SourceError>((snapshot.records.len(), summaries))
        })
        .await
        .map_err(|e| SourceError::Unavailable(format!("refresh task failed: {}", e)))
        .and_then(|r| r);

        let mut report = self.report.write().await;
        match result {
            Ok((record_count, summaries)) => {
                tracing::debug!(
                    "Refresher: {} records -> {} endpoint summaries",
                    record_count,
                    summaries.len()
                );
                report.generated_at = Some(Utc::now());
                report.summaries = summaries;
                report.source_error = None;
            }
            Err(e) => {
                tracing::error!("Refresher: Failed to fetch from {}: {}", report.source, e);
                report.source_error = Some(e.to_string());
            }
        }
    }

    /// A copy of the latest report.
    pub async fn report(&self) -> StatusReport {
        self.report.read().await.clone()
    }

    /// The latest summary for one endpoint.
    pub async fn summary(&self, endpoint_id: &str) -> Option<EndpointSummary> {
        self.report
            .read()
            .await
            .summaries
            .iter()
            .find(|s| s.endpoint_id == endpoint_id)
            .cloned()
    }
}
