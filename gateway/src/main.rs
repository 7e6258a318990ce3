//! Système de Gestion API Gateway

use std::net::SocketAddr;

use anyhow::Context;
use gestion_bootstrap::{Infrastructure, RuntimeConfig, init_runtime, shutdown_signal};
use gestion_gateway::{AppState, build_router, middleware::{cors_layer, handle_panic}};
use gestion_telemetry::init_metrics;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RuntimeConfig::default()
        .load()
        .context("Failed to load configuration")?;
    init_runtime(&config);

    let infra = Infrastructure::from_config(config.clone()).await?;

    let mut state = AppState::new(infra.session_factory());
    match init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder not installed"),
    }

    let app = build_router(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    info!(%addr, "Starting gateway");
    info!("API test: http://{}/api/articles/test", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    infra.close().await;
    info!("Gateway stopped");
    Ok(())
}
