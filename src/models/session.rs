use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 会话状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// 正在采样
    #[default]
    Active,
    /// 已停止，迟到的分类或造句结果会被丢弃
    Stopped,
}

/// 会话统计信息
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SessionStats {
    /// 采样次数
    pub ticks: u64,
    /// 写入缓冲区的检测数
    pub detections_recorded: u64,
    /// 成功生成的句子数
    pub sentences_composed: u64,
    /// 使用模板回退的次数
    pub fallback_compositions: u64,
}

/// 会话元数据
///
/// 不含缓冲区与对话内容，它们由会话控制器持有。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// 会话唯一标识
    pub id: String,
    /// 会话创建时间
    pub created_at: DateTime<Utc>,
    /// 最后活跃时间
    pub last_active_at: DateTime<Utc>,
    /// 会话状态
    pub status: SessionStatus,
    /// 统计信息
    pub stats: SessionStats,
}

impl SessionInfo {
    /// 创建新会话
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_active_at: now,
            status: SessionStatus::Active,
            stats: SessionStats::default(),
        }
    }

    /// 更新最后活跃时间
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new()
    }
}
