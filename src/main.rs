//! PulseTrail - Endpoint Health Status Service
//!
//! Collects reachability probe records and serves per-endpoint health
//! summaries: latest status, latency trend, uptime and alert run lengths.

mod config;
mod db;
mod scheduler;
mod source;
mod status;
mod web;

use config::ServerConfig;
use db::Store;
use scheduler::{Refresher, Scheduler};
use source::{MockSource, ProbeSource, StoreSource};
use status::Classifier;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pulsetrail=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting PulseTrail on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    for name in &cfg.endpoints {
        store.add_endpoint(name)?;
    }
    if !cfg.endpoints.is_empty() {
        tracing::info!("Seeded {} configured endpoints", cfg.endpoints.len());
    }

    // Pick the data source
    let source: Arc<dyn ProbeSource> = if cfg.mock {
        Arc::new(MockSource::new(cfg.endpoints.clone()))
    } else {
        Arc::new(StoreSource::new(store.clone(), &cfg.db_path))
    };
    tracing::info!("Reading probes from {}", source.description());

    let refresher = Arc::new(Refresher::new(
        source,
        Classifier::new(cfg.high_latency_ms),
        cfg.lookback_limit,
        cfg.refresh_interval(),
    ));

    // Start scheduler
    let scheduler = Arc::new(Scheduler::new(store.clone(), refresher, cfg.retention_secs));
    scheduler.start();

    // Start web server
    let server = Server::new(cfg, store, scheduler.clone());
    server
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Shutting down");
    scheduler.stop().await;

    Ok(())
}
