//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::scheduler::Scheduler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub scheduler: Arc<Scheduler>,
}

/// API server for PulseTrail.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, store: Arc<Store>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            state: AppState {
                config,
                store,
                scheduler,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/status", get(handlers::handle_get_status))
            .route("/api/status/{endpoint}", get(handlers::handle_get_endpoint_status))
            .route("/api/stats", get(handlers::handle_get_stats))
            .route("/api/probes", post(handlers::handle_ingest_probes))
            .route(
                "/api/endpoints",
                get(handlers::handle_get_endpoints).post(handlers::handle_create_endpoint),
            )
            .route("/api/endpoints/{name}", delete(handlers::handle_delete_endpoint))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port, running until `shutdown` resolves.
    pub async fn start<F>(
        &self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProbeRecord;
    use crate::scheduler::Refresher;
    use crate::source::StoreSource;
    use crate::status::Classifier;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        store: Arc<Store>,
        scheduler: Arc<Scheduler>,
        _tmp: NamedTempFile,
    }

    fn test_app() -> TestApp {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let source = Arc::new(StoreSource::new(store.clone(), "test.db"));
        let refresher = Arc::new(Refresher::new(
            source,
            Classifier::default(),
            1000,
            Duration::from_secs(60),
        ));
        let scheduler = Arc::new(Scheduler::new(store.clone(), refresher, 3600));
        let server = Server::new(ServerConfig::default(), store.clone(), scheduler.clone());

        TestApp {
            router: server.routes(),
            store,
            scheduler,
            _tmp: tmp,
        }
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        router.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_endpoint_status_is_not_found() {
        let app = test_app();
        let resp = send(&app.router, "GET", "/api/status/nowhere.example", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_endpoint_requires_name() {
        let app = test_app();

        let blank = r#"{"name":"   "}"#;
        let resp = send(&app.router, "POST", "/api/endpoints", Some(blank)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(app.store.get_endpoints().unwrap().is_empty());

        let padded = r#"{"name":" a.example "}"#;
        let resp = send(&app.router, "POST", "/api/endpoints", Some(padded)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await["name"], "a.example");

        let resp = send(&app.router, "GET", "/api/endpoints", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_endpoint() {
        let app = test_app();
        app.store.add_endpoint("a.example").unwrap();

        let resp = send(&app.router, "DELETE", "/api/endpoints/a.example", None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(app.store.get_endpoints().unwrap().is_empty());

        let resp = send(&app.router, "DELETE", "/api/endpoints/a.example", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ingest_then_status() {
        let app = test_app();
        app.store.add_endpoint("a.example").unwrap();

        let records = vec![
            ProbeRecord::success(Utc::now(), "a.example", 12.0),
            ProbeRecord::failure(Utc::now(), "a.example"),
        ];
        let body = serde_json::to_string(&records).unwrap();
        let resp = send(&app.router, "POST", "/api/probes", Some(&body)).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        // Stopping flushes the batch writer
        app.scheduler.stop().await;
        assert_eq!(app.store.get_record_stats().unwrap().count, 2);

        app.scheduler.refresher().refresh_once().await;
        let resp = send(&app.router, "GET", "/api/status/a.example", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["endpoint_id"], "a.example");
        assert_eq!(summary["recent_window"].as_array().unwrap().len(), 2);
        assert_eq!(summary["uptime_percent"], 50.0);

        let resp = send(&app.router, "GET", "/api/status", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["summaries"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_rejects_blank_endpoint() {
        let app = test_app();
        let body = r#"[{"timestamp":"2024-01-01T00:00:00Z","endpoint_id":"","succeeded":false}]"#;
        let resp = send(&app.router, "POST", "/api/probes", Some(body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats() {
        let app = test_app();
        app.store
            .add_probe_records(&[ProbeRecord::failure(Utc::now(), "b.example")])
            .unwrap();

        let resp = send(&app.router, "GET", "/api/stats", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let stats = body_json(resp).await;
        assert_eq!(stats["records"]["count"], 1);
        assert_eq!(stats["lookback_limit"], 1000);
    }
}
