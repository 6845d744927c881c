//! Configuration module for PulseTrail.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the API server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "pulsetrail.db")
    pub db_path: String,
    /// Latency above which a successful probe counts as high latency (default: 100.0)
    pub high_latency_ms: f64,
    /// Seconds between aggregation passes (default: 5)
    pub refresh_secs: u64,
    /// Maximum number of records fetched per aggregation pass (default: 1000)
    pub lookback_limit: usize,
    /// Seconds to keep probe records before pruning (default: 7 days)
    pub retention_secs: i64,
    /// Endpoints seeded into the configured set at startup
    pub endpoints: Vec<String>,
    /// Serve generated demo data instead of the store
    pub mock: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "pulsetrail.db".to_string(),
            high_latency_ms: 100.0,
            refresh_secs: 5,
            lookback_limit: 1000,
            retention_secs: 604800,
            endpoints: Vec::new(),
            mock: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PULSETRAIL_HTTP_PORT`: HTTP port (default: 8080)
    /// - `PULSETRAIL_DB_PATH`: Database file path (default: "pulsetrail.db")
    /// - `PULSETRAIL_HIGH_LATENCY_MS`: High latency threshold (default: 100.0)
    /// - `PULSETRAIL_REFRESH_SECS`: Aggregation interval (default: 5)
    /// - `PULSETRAIL_LOOKBACK_LIMIT`: Records per snapshot (default: 1000)
    /// - `PULSETRAIL_RETENTION_SECS`: Record retention (default: 604800)
    /// - `PULSETRAIL_ENDPOINTS`: Comma-separated endpoint names
    /// - `PULSETRAIL_MOCK`: "1" or "true" to use generated data
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "PULSETRAIL_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("PULSETRAIL_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(threshold) = parse_var::<f64, _>(&lookup, "PULSETRAIL_HIGH_LATENCY_MS") {
            if threshold.is_finite() && threshold > 0.0 {
                cfg.high_latency_ms = threshold;
            }
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "PULSETRAIL_REFRESH_SECS") {
            if secs > 0 {
                cfg.refresh_secs = secs;
            }
        }

        if let Some(limit) = parse_var::<usize, _>(&lookup, "PULSETRAIL_LOOKBACK_LIMIT") {
            if limit > 0 {
                cfg.lookback_limit = limit;
            }
        }

        if let Some(secs) = parse_var::<i64, _>(&lookup, "PULSETRAIL_RETENTION_SECS") {
            if secs > 0 {
                cfg.retention_secs = secs;
            }
        }

        if let Some(list) = lookup("PULSETRAIL_ENDPOINTS") {
            cfg.endpoints = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(mock) = lookup("PULSETRAIL_MOCK") {
            cfg.mock = matches!(mock.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        cfg
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
