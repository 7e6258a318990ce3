//! 服务运行时

use gestion_config::{AppConfig, ConfigError};
use gestion_telemetry::{LogFormat, init_tracing};
use tracing::info;

/// 服务运行时配置
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// 读取 `.env`（若存在）后加载配置
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();
        AppConfig::load(&self.config_dir)
    }
}

/// 初始化 tracing，生产环境输出 JSON
pub fn init_runtime(config: &AppConfig) {
    let format = if config.is_production() {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(&config.telemetry.log_level, format);

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}
