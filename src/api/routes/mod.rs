//! Routes 模块
//!
//! 定义 API 路由。

pub mod grammar_routes;
pub mod session_routes;
