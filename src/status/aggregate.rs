//! Per-endpoint aggregation of probe records into status summaries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Classifier, Status};
use crate::db::ProbeRecord;

/// Number of probes kept in the recent and chart windows.
pub const WINDOW_SIZE: usize = 50;

/// Reconciled health summary for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub endpoint_id: String,
    pub resolved_address: Option<String>,
    pub latest_status: Option<Status>,
    /// Most recent probes, most-recent-first.
    pub recent_window: Vec<ProbeRecord>,
    /// Most recent probes with a measured latency, oldest-first.
    pub chart_window: Vec<ProbeRecord>,
    /// Mean latency over `chart_window`.
    pub average_latency_ms: Option<f64>,
    /// Share of all observed probes that did not fail, in percent.
    pub uptime_percent: f64,
    pub consecutive_failures: usize,
    pub consecutive_high_latency_alerts: usize,
}

impl EndpointSummary {
    /// Summary for an endpoint with no observed probes.
    pub fn empty(endpoint_id: &str) -> Self {
        Self {
            endpoint_id: endpoint_id.to_string(),
            resolved_address: None,
            latest_status: None,
            recent_window: Vec::new(),
            chart_window: Vec::new(),
            average_latency_ms: None,
            uptime_percent: 0.0,
            consecutive_failures: 0,
            consecutive_high_latency_alerts: 0,
        }
    }
}

/// A probe paired with its status, classified once and reused.
type Classified<'a> = (&'a ProbeRecord, Status);

/// The most recent probes that carry a latency, most-recent-first.
///
/// Both the chart and the average are read from this one window.
struct LatencyWindow<'a> {
    entries: Vec<(&'a ProbeRecord, f64)>,
}

impl<'a> LatencyWindow<'a> {
    fn collect(group: &[Classified<'a>]) -> Self {
        let entries = group
            .iter()
            .filter_map(|&(record, _)| record.latency_ms.map(|latency| (record, latency)))
            .take(WINDOW_SIZE)
            .collect();
        Self { entries }
    }

    fn average(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|&(_, latency)| latency).sum();
        Some(sum / self.entries.len() as f64)
    }

    fn into_chart(self) -> Vec<ProbeRecord> {
        self.entries
            .into_iter()
            .rev()
            .map(|(record, _)| record.clone())
            .collect()
    }
}

/// Build one summary per endpoint from a snapshot of probe records.
///
/// Every endpoint in `configured` appears exactly once. When `configured`
/// is non-empty, endpoints outside it are dropped; when it is empty, every
/// observed endpoint is reported. Output is sorted by endpoint id.
///
/// Records sharing a timestamp keep their input order.
pub fn aggregate(
    records: &[ProbeRecord],
    configured: &BTreeSet<String>,
    classifier: &Classifier,
) -> Vec<EndpointSummary> {
    let mut groups: BTreeMap<&str, Vec<Classified<'_>>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.endpoint_id.as_str())
            .or_default()
            .push((record, classifier.classify(record)));
    }

    let mut summaries: BTreeMap<String, EndpointSummary> = BTreeMap::new();

    for (endpoint_id, mut group) in groups {
        if !configured.is_empty() && !configured.contains(endpoint_id) {
            continue;
        }

        // sort_by is stable, ties stay in input order
        group.sort_by(|a, b| b.0.timestamp.cmp(&a.0.timestamp));
        summaries.insert(endpoint_id.to_string(), summarize(endpoint_id, &group));
    }

    for endpoint_id in configured {
        summaries
            .entry(endpoint_id.clone())
            .or_insert_with(|| EndpointSummary::empty(endpoint_id));
    }

    summaries.into_values().collect()
}

/// Summarize a group already sorted most-recent-first.
fn summarize(endpoint_id: &str, group: &[Classified<'_>]) -> EndpointSummary {
    let Some(&(latest, latest_status)) = group.first() else {
        return EndpointSummary::empty(endpoint_id);
    };

    let recent_window = group
        .iter()
        .take(WINDOW_SIZE)
        .map(|&(record, _)| record.clone())
        .collect();

    let latency_window = LatencyWindow::collect(group);
    let average_latency_ms = latency_window.average();
    let chart_window = latency_window.into_chart();

    let up = group.iter().filter(|&&(_, status)| !status.is_failure()).count();
    let uptime_percent = 100.0 * up as f64 / group.len() as f64;

    EndpointSummary {
        endpoint_id: endpoint_id.to_string(),
        resolved_address: latest.resolved_address.clone(),
        latest_status: Some(latest_status),
        recent_window,
        chart_window,
        average_latency_ms,
        uptime_percent,
        consecutive_failures: run_length(group, Status::PingFailure),
        consecutive_high_latency_alerts: run_length(group, Status::HighLatency),
    }
}

/// Length of the run of `status` starting at the most recent record.
fn run_length(group: &[Classified<'_>], status: Status) -> usize {
    group.iter().take_while(|&&(_, s)| s == status).count()
}
