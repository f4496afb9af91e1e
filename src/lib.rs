//! MediSign - 医疗手语症状沟通服务
//!
//! 把摄像头识别出的医疗手势整理成完整的症状描述句，帮助听障患者与医护人员对话。
//! 检测结果先进入滑动缓冲区，由触发器决定何时造句，再经症状映射和造句器写入对话记录。

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod observability;
pub mod services;
