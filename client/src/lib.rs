//! gestion-client - 终端展示客户端
//!
//! 通过 HTTP 调用网关；除界面校验和变更后刷新外不含业务逻辑。

pub mod api;
pub mod dashboard;
pub mod log;
pub mod pages;
pub mod views;

pub use api::{ApiClient, ClientError, ClientResult, DEFAULT_API_URL};
pub use dashboard::{Statistiques, charger_statistiques};
pub use log::{ActivityLog, LogEntry, LogLevel};
pub use pages::{ArticlesPage, CommandesPage, LivraisonsPage, PageError, PageResult};
