//! gestion-errors - 统一错误处理
//!
//! 所有失败都以 `{success: false, error}` 信封返回：
//! 校验错误与业务规则拒绝为 400，其余后端错误为 500 并原样透传消息。

mod rules;

pub use rules::BusinessRule;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求字段缺失或无效
    #[error("{0}")]
    Validation(String),

    /// 数据库包以编码错误拒绝
    #[error("{0}")]
    Rejected(BusinessRule),

    /// 其他数据库错误，消息原样透传
    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rejected(rule: BusinessRule) -> Self {
        Self::Rejected(rule)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Rejected(_) => 400,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// 业务规则编码（仅 Rejected）
    pub fn rule(&self) -> Option<BusinessRule> {
        match self {
            Self::Rejected(rule) => Some(*rule),
            _ => None,
        }
    }

    /// 转换为失败信封
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            error: self.to_string(),
        }
    }
}

/// 失败响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let rule = self.rule();
        let mut response = (status, Json(self.to_envelope())).into_response();
        // 供指标中间件统计业务规则拒绝
        if let Some(rule) = rule {
            response.extensions_mut().insert(rule);
        }
        response
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation("x").status_code(), 400);
        assert_eq!(
            AppError::rejected(BusinessRule::QuotaLivreurAtteint).status_code(),
            400
        );
        assert_eq!(AppError::database("ORA-00942").status_code(), 500);
        assert_eq!(AppError::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_database_message_passes_through() {
        let err = AppError::database("relation \"articles\" does not exist");
        assert_eq!(err.to_string(), "relation \"articles\" does not exist");
    }

    #[test]
    fn test_rejection_uses_fixed_sentence() {
        let err = AppError::rejected(BusinessRule::AnnulationImpossible);
        assert_eq!(err.to_string(), BusinessRule::AnnulationImpossible.message());
        assert_eq!(err.rule(), Some(BusinessRule::AnnulationImpossible));
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(AppError::validation("noclt requis").to_envelope()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "noclt requis");
    }

    #[tokio::test]
    async fn test_into_response_status() {
        let response = AppError::database("down").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::validation("missing").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<BusinessRule>().is_none());
    }

    #[tokio::test]
    async fn test_rejection_response_carries_rule() {
        let response = AppError::rejected(BusinessRule::DateLivraisonPassee).into_response();
        assert_eq!(
            response.extensions().get::<BusinessRule>(),
            Some(&BusinessRule::DateLivraisonPassee)
        );
    }
}
