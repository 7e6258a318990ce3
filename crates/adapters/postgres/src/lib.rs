//! gestion-adapter-postgres - PostgreSQL 适配器
//!
//! 数据库包映射为 schema，包过程映射为函数；业务规则错误以 SQLSTATE 携带规则编号。

mod connection;
mod error_mapper;
mod rows;
mod session;

pub use connection::*;
pub use error_mapper::map_sqlx_error;
pub use session::*;
