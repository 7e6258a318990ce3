//! 基础设施资源管理
//!
//! 连接池在这里显式创建、注入网关并在退出时关闭。

use std::sync::Arc;
use std::time::Duration;

use gestion_adapter_postgres::{PgSessionFactory, PostgresConfig, check_connection, create_pool};
use gestion_config::AppConfig;
use gestion_errors::AppResult;
use gestion_ports::SessionFactory;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::retry::{RetryConfig, with_retry_optional};

/// 基础设施资源容器
pub struct Infrastructure {
    pool: PgPool,
    database_reachable: bool,
}

impl Infrastructure {
    /// 从配置创建连接池
    ///
    /// 启动时带重试地探测一次数据库；探测失败只告警，服务照常启动，
    /// 之后的请求各自尝试取连接。
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        Self::with_retry_config(config, RetryConfig::default()).await
    }

    pub async fn with_retry_config(config: AppConfig, retry: RetryConfig) -> AppResult<Self> {
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_pool_size(
                config.database.min_connections,
                config.database.max_connections,
            )
            .with_acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .with_application_name(&config.app_name);
        let pool = create_pool(&pg_config)?;

        let database_reachable = with_retry_optional(&retry, "PostgreSQL connection", || {
            let pool = pool.clone();
            async move { check_connection(&pool).await }
        })
        .await
        .is_some();

        if database_reachable {
            info!(
                min_connections = pg_config.min_connections,
                max_connections = pg_config.max_connections,
                "PostgreSQL connection pool created"
            );
        } else {
            warn!("PostgreSQL unreachable, continuing without database connection");
        }

        Ok(Self {
            pool,
            database_reachable,
        })
    }

    /// 启动探测是否成功
    pub fn database_reachable(&self) -> bool {
        self.database_reachable
    }

    /// 注入网关的会话工厂
    pub fn session_factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(PgSessionFactory::new(self.pool.clone()))
    }

    /// 关闭连接池，等待借出的连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }
}
