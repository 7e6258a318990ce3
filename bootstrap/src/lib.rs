//! gestion-bootstrap - 服务启动骨架
//!
//! 配置加载、tracing 初始化、连接池创建与关闭信号

mod infrastructure;
mod retry;
mod runtime;
mod shutdown;

pub use infrastructure::*;
pub use retry::*;
pub use runtime::*;
pub use shutdown::*;
