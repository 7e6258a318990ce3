//! gestion-ports - 抽象 trait 层
//!
//! 每个资源组一个 Repository trait，由会话（一次请求的事务）统一提供。

#[cfg(feature = "memory")]
pub mod memory;
mod repository;
mod unit_of_work;

pub use repository::*;
pub use unit_of_work::*;
