//! gestion-gateway - REST 网关
//!
//! 四个资源组挂在 `/api` 下，每个请求一个数据库会话。

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routing;
pub mod state;

pub use routing::build_router;
pub use state::AppState;
