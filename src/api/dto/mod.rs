//! DTO 模块
//!
//! 数据传输对象，用于 API 请求和响应的序列化。

pub mod grammar_dto;
pub mod session_dto;

pub use grammar_dto::*;
pub use session_dto::*;
