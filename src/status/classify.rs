//! Per-probe status classification.

use serde::{Deserialize, Serialize};

use crate::db::ProbeRecord;

/// Default latency above which a successful probe is reported as slow.
pub const DEFAULT_HIGH_LATENCY_MS: f64 = 100.0;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    HighLatency,
    PingFailure,
}

impl Status {
    pub fn is_failure(self) -> bool {
        self == Status::PingFailure
    }
}

/// Maps probe records to a [`Status`] using a latency threshold.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    high_latency_ms: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_LATENCY_MS)
    }
}

impl Classifier {
    pub fn new(high_latency_ms: f64) -> Self {
        Self { high_latency_ms }
    }

    pub fn high_latency_ms(&self) -> f64 {
        self.high_latency_ms
    }

    /// Classify one record.
    ///
    /// `succeeded == false` always wins. A "success" without a latency is
    /// treated as a failure to measure. Negative latencies are classified
    /// like any other value.
    pub fn classify(&self, record: &ProbeRecord) -> Status {
        if !record.succeeded {
            return Status::PingFailure;
        }

        match record.latency_ms {
            None => Status::PingFailure,
            Some(latency) if latency > self.high_latency_ms => Status::HighLatency,
            Some(_) => Status::Success,
        }
    }
}
