//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod grammar_handler;
pub mod session_handler;

pub use grammar_handler::*;
pub use session_handler::*;
