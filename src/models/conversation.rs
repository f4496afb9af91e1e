use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 对话角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 用手势表达症状的一方
    Subject,
    /// 对话的另一方（医护人员）
    Counterpart,
}

/// 对话记录条目
///
/// 创建后不可修改，只能随对话记录整体淘汰或清空。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    /// 条目唯一标识
    pub id: String,
    /// 发言角色
    pub role: Role,
    /// 句子内容
    pub text: String,
    /// 创建时间
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn subject(text: impl Into<String>) -> Self {
        Self::new(Role::Subject, text)
    }

    pub fn counterpart(text: impl Into<String>) -> Self {
        Self::new(Role::Counterpart, text)
    }
}
