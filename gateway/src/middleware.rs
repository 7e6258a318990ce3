//! 中间件

use std::any::Any;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use gestion_config::CorsConfig;
use gestion_errors::{AppError, BusinessRule};
use gestion_telemetry::{BUSINESS_REJECTIONS_TOTAL, REQUESTS_TOTAL};
use tower_http::cors::{self, CorsLayer};
use tracing::{error, warn};

/// 请求计数中间件
///
/// 按路由模板（而非实际路径）和状态码计数；业务规则拒绝另按规则编号计数。
pub async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    metrics::counter!(
        REQUESTS_TOTAL,
        "route" => route,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    if let Some(rule) = response.extensions().get::<BusinessRule>() {
        metrics::counter!(BUSINESS_REJECTIONS_TOTAL, "code" => rule.code().to_string())
            .increment(1);
    }

    response
}

/// CORS 层，未配置来源时放开
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any)
}

/// handler panic 时返回统一的 500 信封
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");

    AppError::internal("Internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_panic_becomes_envelope() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
