//! Generated probe data for offline demos.

use chrono::{Duration, Utc};
use rand::Rng;

use super::{ProbeSource, Snapshot, SourceError};
use crate::db::ProbeRecord;

/// Seconds between generated probes for one endpoint.
const PROBE_SPACING_SECS: i64 = 5;

/// A source that invents plausible probe history on every fetch.
///
/// Most probes succeed quickly, some are slow and a few fail outright.
#[derive(Debug)]
pub struct MockSource {
    endpoints: Vec<String>,
    description: String,
}

impl MockSource {
    pub fn new(endpoints: Vec<String>) -> Self {
        let endpoints = if endpoints.is_empty() {
            vec![
                "gateway.local".to_string(),
                "dns.example.net".to_string(),
                "api.example.com".to_string(),
            ]
        } else {
            endpoints
        };
        let description = format!("mock: {} endpoints", endpoints.len());
        Self {
            endpoints,
            description,
        }
    }
}

impl ProbeSource for MockSource {
    fn fetch_snapshot(&self, limit: usize) -> Result<Snapshot, SourceError> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let per_endpoint = limit / self.endpoints.len().max(1);

        let mut records = Vec::with_capacity(per_endpoint * self.endpoints.len());
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            let address = format!("192.0.2.{}", idx + 1);
            for step in 0..per_endpoint {
                let timestamp = now - Duration::seconds(step as i64 * PROBE_SPACING_SECS);
                let roll: f64 = rng.gen();
                let record = if roll < 0.08 {
                    ProbeRecord::failure(timestamp, endpoint)
                } else if roll < 0.2 {
                    ProbeRecord::success(timestamp, endpoint, rng.gen_range(100.0..400.0))
                } else {
                    ProbeRecord::success(timestamp, endpoint, rng.gen_range(4.0..90.0))
                };
                records.push(record.with_address(&address));
            }
        }

        Ok(Snapshot {
            records,
            configured: self.endpoints.iter().cloned().collect(),
        })
    }

    fn description(&self) -> &str {
        &self.description
    }
}
