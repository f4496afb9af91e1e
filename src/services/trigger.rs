//! 造句触发器
//!
//! 单帧分类结果噪声很大，触发器只在证据足够时才放行一次造句：
//!
//! 1. 缓冲区至少有 `min_to_fire` 个标签；
//! 2. 最近 `recent_window` 个标签中至少有一个不在上一次造句使用的标签集合里；
//! 3. 距上一次成功造句超过冷却时间。`CooldownPolicy::NoveltyOverrides` 下，
//!    若最近标签里出现本会话从未造过句的标签，则跳过冷却检查。
//!
//! 触发后进入 `Composing`，在 [`SentenceTrigger::complete`] 或
//! [`SentenceTrigger::abort`] 之前不会再次触发。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::config::PipelineConfig;
use crate::models::GestureLabel;

/// 冷却策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPolicy {
    /// 冷却期内一律不触发
    #[default]
    Strict,
    /// 全新症状可以无视冷却立即触发
    NoveltyOverrides,
}

/// 触发器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPhase {
    Idle,
    Composing,
}

/// 触发器参数
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub min_to_fire: usize,
    pub recent_window: usize,
    pub cooldown: Duration,
    pub policy: CooldownPolicy,
    pub dedup: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for TriggerConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            min_to_fire: config.min_to_fire,
            recent_window: config.recent_window,
            cooldown: config.cooldown(),
            policy: config.cooldown_policy,
            dedup: config.dedup_before_mapping,
        }
    }
}

/// 触发器状态，只在成功造句时更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerState {
    /// 上一次造句使用的标签
    pub last_processed: HashSet<GestureLabel>,
    /// 上一次成功造句的时间
    pub last_update: Option<Instant>,
    /// 本会话造过句的全部标签
    pub composed_history: HashSet<GestureLabel>,
}

/// 一次评估的结论
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// 已有造句在进行
    InFlight,
    /// 标签数量不足
    TooFew { have: usize, need: usize },
    /// 最近标签都已造过句
    NothingNew,
    /// 仍在冷却期
    CoolingDown { remaining: Duration },
    /// 可以造句，附带待造句的标签
    Ready(Vec<GestureLabel>),
}

/// 造句触发器
#[derive(Debug, Clone)]
pub struct SentenceTrigger {
    config: TriggerConfig,
    state: TriggerState,
    phase: TriggerPhase,
}

impl SentenceTrigger {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            state: TriggerState::default(),
            phase: TriggerPhase::Idle,
        }
    }

    /// 只读评估，不改变状态
    pub fn check(&self, snapshot: &[GestureLabel], now: Instant) -> Readiness {
        if self.phase == TriggerPhase::Composing {
            return Readiness::InFlight;
        }

        if snapshot.len() < self.config.min_to_fire {
            return Readiness::TooFew {
                have: snapshot.len(),
                need: self.config.min_to_fire,
            };
        }

        let recent = &snapshot[snapshot.len().saturating_sub(self.config.recent_window)..];
        if recent
            .iter()
            .all(|label| self.state.last_processed.contains(label))
        {
            return Readiness::NothingNew;
        }

        if let Some(remaining) = self.cooldown_remaining(now) {
            let waived = self.config.policy == CooldownPolicy::NoveltyOverrides
                && recent
                    .iter()
                    .any(|label| !self.state.composed_history.contains(label));
            if !waived {
                return Readiness::CoolingDown { remaining };
            }
        }

        Readiness::Ready(self.batch_from(recent))
    }

    /// 评估并在满足条件时进入 `Composing`，返回待造句的标签
    pub fn evaluate(&mut self, snapshot: &[GestureLabel], now: Instant) -> Option<Vec<GestureLabel>> {
        match self.check(snapshot, now) {
            Readiness::Ready(batch) => {
                debug!("Trigger fired with {} label(s)", batch.len());
                self.phase = TriggerPhase::Composing;
                Some(batch)
            }
            readiness => {
                debug!(?readiness, "Trigger not ready");
                None
            }
        }
    }

    /// 造句成功
    pub fn complete(&mut self, batch: &[GestureLabel], now: Instant) {
        self.state.last_processed = batch.iter().cloned().collect();
        self.state.composed_history.extend(batch.iter().cloned());
        self.state.last_update = Some(now);
        self.phase = TriggerPhase::Idle;
    }

    /// 造句没有产出或会话已停止，回到 Idle 且不更新状态
    pub fn abort(&mut self) {
        self.phase = TriggerPhase::Idle;
    }

    pub fn clear(&mut self) {
        self.state = TriggerState::default();
        self.phase = TriggerPhase::Idle;
    }

    pub fn phase(&self) -> TriggerPhase {
        self.phase
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.state.last_update?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed > self.config.cooldown {
            None
        } else {
            Some(self.config.cooldown - elapsed)
        }
    }

    fn batch_from(&self, recent: &[GestureLabel]) -> Vec<GestureLabel> {
        if !self.config.dedup {
            return recent.to_vec();
        }

        let mut seen = HashSet::new();
        recent
            .iter()
            .filter(|label| seen.insert((*label).clone()))
            .cloned()
            .collect()
    }
}
