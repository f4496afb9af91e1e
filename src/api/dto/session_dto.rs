//! 会话 DTO
//!
//! 定义会话相关的请求和响应数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConversationEntry, GestureLabel, Prediction, SessionStats, SessionStatus};
use crate::services::session::{SessionSnapshot, TickOutcome};
use crate::services::trigger::TriggerPhase;

/// 创建会话响应
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    /// 会话 ID
    pub id: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 会话详情响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub stats: SessionStats,
    /// 检测缓冲区，从旧到新
    pub buffer: Vec<GestureLabel>,
    /// 对话记录，从旧到新
    pub conversation: Vec<ConversationEntry>,
    pub phase: TriggerPhase,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.info.id,
            status: snapshot.info.status,
            created_at: snapshot.info.created_at,
            last_active_at: snapshot.info.last_active_at,
            stats: snapshot.info.stats,
            buffer: snapshot.buffer,
            conversation: snapshot.conversation,
            phase: snapshot.phase,
        }
    }
}

/// 会话列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
    pub total: usize,
}

/// 一帧的分类器输出
#[derive(Debug, Deserialize)]
pub struct PredictionsRequest {
    pub predictions: Vec<Prediction>,
}

/// 被拒绝或被记录的检测
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub label: GestureLabel,
    pub confidence: f32,
}

/// 一次采样的处理结果
#[derive(Debug, Serialize, Deserialize)]
pub struct TickResponse {
    /// inactive / no_detection / rejected / recorded / composed / discarded
    pub outcome: String,
    /// 被拒绝的检测
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<DetectionResponse>,
    /// 新生成的句子
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence: Option<ConversationEntry>,
    /// 处理后的缓冲区
    pub buffer: Vec<GestureLabel>,
}

impl TickResponse {
    pub fn new(outcome: TickOutcome, buffer: Vec<GestureLabel>) -> Self {
        let (name, rejected, sentence) = match outcome {
            TickOutcome::Inactive => ("inactive", None, None),
            TickOutcome::NoDetection => ("no_detection", None, None),
            TickOutcome::Rejected(detection) => (
                "rejected",
                Some(DetectionResponse {
                    label: detection.label,
                    confidence: detection.confidence,
                }),
                None,
            ),
            TickOutcome::Recorded => ("recorded", None, None),
            TickOutcome::Composed(entry) => ("composed", None, Some(entry)),
            TickOutcome::Discarded => ("discarded", None, None),
        };

        Self {
            outcome: name.to_string(),
            rejected,
            sentence,
            buffer,
        }
    }
}

/// 可识别的手势及其症状短语
#[derive(Debug, Serialize, Deserialize)]
pub struct GestureResponse {
    pub label: GestureLabel,
    pub phrase: String,
}

/// 对方消息请求
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}
