//! gestion-telemetry - 可观测性库
//!
//! tracing 订阅器、Prometheus 记录器与就绪检查汇总。

use std::fmt::Display;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 请求计数指标名
pub const REQUESTS_TOTAL: &str = "gestion_requests_total";

/// 业务规则拒绝计数指标名
pub const BUSINESS_REJECTIONS_TOTAL: &str = "gestion_business_rejections_total";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// 生产环境
    Json,
}

/// 初始化 tracing，`RUST_LOG` 优先于配置的级别
///
/// 全局订阅器已存在时（例如测试中重复初始化）静默跳过。
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing already initialized");
    }
}

/// 安装 Prometheus 记录器并登记指标说明
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!(REQUESTS_TOTAL, "HTTP requests handled, by route and status");
    metrics::describe_counter!(
        BUSINESS_REJECTIONS_TOTAL,
        "Requests rejected by a coded database business rule"
    );

    Ok(handle)
}

/// 就绪检查汇总，任一项失败即整体失败
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            healthy: true,
            checks: Vec::new(),
        }
    }
}

impl HealthStatus {
    /// 记录一项检查结果，错误文本作为说明
    pub fn check<E: Display>(mut self, name: impl Into<String>, result: Result<(), E>) -> Self {
        let (healthy, message) = match result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        self.healthy &= healthy;
        self.checks.push(HealthCheck {
            name: name.into(),
            healthy,
            message,
        });
        self
    }
}
