//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, ProbeRecord, RecordStats};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// API: Status
// ============================================================================

pub async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.refresher().report().await)
}

pub async fn handle_get_endpoint_status(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> impl IntoResponse {
    match state.scheduler.refresher().summary(&endpoint).await {
        Some(summary) => Json(summary).into_response(),
        None => (StatusCode::NOT_FOUND, "Endpoint not found").into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub db_size_bytes: i64,
    pub records: RecordStats,
    pub configured_endpoints: usize,
    pub lookback_limit: usize,
}

pub async fn handle_get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let records = match state.store.get_record_stats() {
        Ok(r) => r,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let configured_endpoints = state.store.get_endpoints().map(|e| e.len()).unwrap_or(0);

    Json(StatsResponse {
        db_size_bytes: state.store.get_db_size_bytes().unwrap_or(0),
        records,
        configured_endpoints,
        lookback_limit: state.config.lookback_limit,
    })
    .into_response()
}

// ============================================================================
// API: Probe ingest
// ============================================================================

/// Reject payloads that cannot become probe records.
pub fn validate_probes(records: &[ProbeRecord]) -> Result<(), String> {
    for (i, r) in records.iter().enumerate() {
        if r.endpoint_id.trim().is_empty() {
            return Err(format!("record {} has an empty endpoint_id", i));
        }
    }
    Ok(())
}

pub async fn handle_ingest_probes(
    State(state): State<AppState>,
    Json(records): Json<Vec<ProbeRecord>>,
) -> impl IntoResponse {
    if let Err(e) = validate_probes(&records) {
        return (StatusCode::BAD_REQUEST, e).into_response();
    }

    let count = records.len();
    match state.scheduler.ingest(records).await {
        Ok(()) => {
            tracing::debug!("Accepted {} probe records", count);
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Endpoints
// ============================================================================

pub async fn handle_get_endpoints(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_endpoints() {
        Ok(endpoints) => Json(endpoints).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
}

pub async fn handle_create_endpoint(
    State(state): State<AppState>,
    Json(req): Json<CreateEndpointRequest>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Endpoint name is required").into_response();
    }

    match state.store.add_endpoint(name) {
        Ok(endpoint) => {
            tracing::info!("Tracking endpoint {}", endpoint.name);
            (StatusCode::CREATED, Json(endpoint)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_delete_endpoint(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_endpoint(&name) {
        Ok(()) => {
            tracing::info!("Stopped tracking endpoint {}", name);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Endpoint not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_validate_probes() {
        let good = vec![
            ProbeRecord::success(Utc::now(), "a", 1.0),
            ProbeRecord::failure(Utc::now(), "b"),
        ];
        assert!(validate_probes(&good).is_ok());
        assert!(validate_probes(&[]).is_ok());

        let bad = vec![
            ProbeRecord::success(Utc::now(), "a", 1.0),
            ProbeRecord::failure(Utc::now(), "  "),
        ];
        let err = validate_probes(&bad).unwrap_err();
        assert!(err.contains("record 1"));
    }

    #[test]
    fn test_ingest_payload_without_latency() {
        let body = r#"[
            {"timestamp":"2024-01-01T00:00:00Z","endpoint_id":"a","latency_ms":12.0,"succeeded":true},
            {"timestamp":"2024-01-01T00:00:05Z","endpoint_id":"a","succeeded":false}
        ]"#;
        let records: Vec<ProbeRecord> = serde_json::from_str(body).unwrap();
        assert!(validate_probes(&records).is_ok());
        assert_eq!(records[1].latency_ms, None);
    }
}
