//! 核心数据模型模块
//!
//! 定义 MediSign 的核心数据结构：手势标签、检测结果、对话条目与会话元数据。

pub mod conversation;
pub mod gesture;
pub mod session;

pub use conversation::*;
pub use gesture::*;
pub use session::*;
