//! 数据库错误映射
//!
//! 数据库包以 SQLSTATE `20011`、`20022` 等拒绝请求；错误码能解析为已知规则时
//! 返回固定提示，其余错误原样透传数据库消息。

use gestion_errors::{AppError, BusinessRule};

/// 将 SQLx 错误转换为 AppError
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db_err) => {
            match db_err.code().as_deref().and_then(BusinessRule::from_db_code) {
                Some(rule) => {
                    tracing::debug!(code = rule.code(), "Database package rejected the request");
                    AppError::rejected(rule)
                }
                None => AppError::database(db_err.message().to_string()),
            }
        }
        sqlx::Error::PoolTimedOut => AppError::database("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::database("Database connection pool is closed"),
        _ => AppError::database(e.to_string()),
    }
}
