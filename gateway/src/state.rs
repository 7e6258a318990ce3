//! 路由共享状态

use std::sync::Arc;

use gestion_ports::SessionFactory;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    /// 连接池，由 bootstrap 创建后注入
    pub sessions: Arc<dyn SessionFactory>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
