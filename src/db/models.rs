//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured endpoint that should always appear in status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A single observed probe attempt.
///
/// A missing or `null` `latency_ms` on the wire means the probe got no
/// response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub timestamp: DateTime<Utc>,
    pub endpoint_id: String,
    #[serde(default)]
    pub resolved_address: Option<String>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    pub succeeded: bool,
}

impl ProbeRecord {
    /// A probe that answered in `latency_ms`.
    pub fn success(timestamp: DateTime<Utc>, endpoint_id: &str, latency_ms: f64) -> Self {
        Self {
            timestamp,
            endpoint_id: endpoint_id.to_string(),
            resolved_address: None,
            latency_ms: Some(latency_ms),
            succeeded: true,
        }
    }

    /// A probe that got no response.
    pub fn failure(timestamp: DateTime<Utc>, endpoint_id: &str) -> Self {
        Self {
            timestamp,
            endpoint_id: endpoint_id.to_string(),
            resolved_address: None,
            latency_ms: None,
            succeeded: false,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.resolved_address = Some(address.to_string());
        self
    }
}

/// Probe record statistics for the status report.
#[derive(Debug, Clone, Serialize)]
pub struct RecordStats {
    pub count: i64,
    pub endpoints: i64,
}
