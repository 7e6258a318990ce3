//! 路由

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use gestion_telemetry::HealthStatus;
use serde::Serialize;

use crate::handlers::{articles, commandes, ligcdes, livraisons};
use crate::middleware::track_requests;
use crate::state::AppState;

/// 完整的应用路由（不含 CORS/Trace 等外层）
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api/articles", articles::routes())
        .nest("/api/commandes", commandes::routes())
        .nest("/api/ligcdes", ligcdes::routes())
        .nest("/api/livraisons", livraisons::routes())
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub articles: &'static str,
    pub commandes: &'static str,
    pub livraisons: &'static str,
    pub ligcdes: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub endpoints: Endpoints,
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "API Systeme de Gestion",
        endpoints: Endpoints {
            articles: "/api/articles",
            commandes: "/api/commandes",
            livraisons: "/api/livraisons",
            ligcdes: "/api/ligcdes",
        },
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn readiness_check(State(state): State<AppState>) -> Response {
    let status = HealthStatus::default().check("database", state.sessions.ping().await);

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
