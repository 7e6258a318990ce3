//! gestion-domain - 领域核心类型
//!
//! 实体只是数据库记录的透传视图，业务规则的权威在数据库包中；
//! 这里只保存应用层需要知道的那一小部分：状态编码、后继状态表、日期解析和表单校验。

mod article;
mod commande;
mod date;
mod ligcde;
mod livraison;

pub use article::*;
pub use commande::*;
pub use date::*;
pub use ligcde::*;
pub use livraison::*;

// Re-export error types
pub use gestion_errors::{AppError, AppResult, BusinessRule};
