//! 会话控制器
//!
//! 一个会话独占一组检测缓冲区、触发器状态和对话记录，三者放在同一把锁里。
//! 锁从不跨越 `.await` 持有：分类和造句期间释放锁，结果回来后再检查
//! 会话纪元（epoch），停止或清空之后迟到的结果直接丢弃。

pub mod registry;

pub use registry::SessionRegistry;

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::classifier::{Classifier, ClassifierAdapter, Frame, FrameSource, top_detection};
use crate::config::config::PipelineConfig;
use crate::models::{
    ConversationEntry, Detection, GestureLabel, Prediction, SessionInfo, SessionStatus,
};
use crate::observability::AppMetrics;
use crate::services::composer::{CompositionSource, SentenceComposer};
use crate::services::conversation_log::ConversationLog;
use crate::services::detection_buffer::DetectionBuffer;
use crate::services::symptom_mapper::SymptomMapper;
use crate::services::trigger::{SentenceTrigger, TriggerConfig, TriggerPhase};

/// 一次采样的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// 会话已停止，或结果属于已失效的纪元
    Inactive,
    /// 分类失败或没有合法预测
    NoDetection,
    /// 低于阈值或为 "nothing"，未写入缓冲区
    Rejected(Detection),
    /// 已写入缓冲区，未触发造句
    Recorded,
    /// 触发造句并写入对话记录
    Composed(ConversationEntry),
    /// 造句期间会话被停止或清空，结果被丢弃
    Discarded,
}

/// 会话快照
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub info: SessionInfo,
    pub buffer: Vec<GestureLabel>,
    pub conversation: Vec<ConversationEntry>,
    pub phase: TriggerPhase,
}

struct SessionCore {
    info: SessionInfo,
    buffer: DetectionBuffer,
    trigger: SentenceTrigger,
    log: ConversationLog,
    epoch: u64,
}

impl SessionCore {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.info.status == SessionStatus::Active
    }
}

/// 会话控制器
pub struct SessionController {
    config: PipelineConfig,
    adapter: ClassifierAdapter,
    composer: SentenceComposer,
    mapper: SymptomMapper,
    metrics: Option<Arc<AppMetrics>>,
    core: Mutex<SessionCore>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("SessionController")
            .field("id", &core.info.id)
            .field("status", &core.info.status)
            .field("buffered", &core.buffer.len())
            .field("conversation", &core.log.len())
            .field("composer", &self.composer)
            .finish()
    }
}

impl SessionController {
    pub fn new(
        info: SessionInfo,
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        composer: SentenceComposer,
    ) -> Self {
        let core = SessionCore {
            info,
            buffer: DetectionBuffer::new(config.buffer_capacity, config.confidence_threshold),
            trigger: SentenceTrigger::new(TriggerConfig::from(&config)),
            log: ConversationLog::new(config.conversation_capacity),
            epoch: 0,
        };

        Self {
            config,
            adapter: ClassifierAdapter::new(classifier),
            composer,
            mapper: SymptomMapper::new(),
            metrics: None,
            core: Mutex::new(core),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn id(&self) -> String {
        self.core.lock().info.id.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.core.lock().info.status == SessionStatus::Active
    }

    pub fn start(&self) {
        let mut core = self.core.lock();
        if core.info.status != SessionStatus::Active {
            core.info.status = SessionStatus::Active;
            core.info.touch();
            info!("Session {} started", core.info.id);
        }
    }

    /// 停止会话，进行中的分类和造句结果都不会再写入状态
    pub fn stop(&self) {
        let mut core = self.core.lock();
        if core.info.status == SessionStatus::Stopped {
            return;
        }
        core.info.status = SessionStatus::Stopped;
        core.epoch += 1;
        core.trigger.abort();
        core.info.touch();
        info!("Session {} stopped", core.info.id);
    }

    /// 同时清空缓冲区、对话记录和触发器状态
    pub fn clear(&self) {
        let mut core = self.core.lock();
        core.buffer.clear();
        core.log.clear();
        core.trigger.clear();
        core.epoch += 1;
        core.info.touch();
        info!("Session {} cleared", core.info.id);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let core = self.core.lock();
        SessionSnapshot {
            info: core.info.clone(),
            buffer: core.buffer.snapshot(),
            conversation: core.log.entries(),
            phase: core.trigger.phase(),
        }
    }

    /// 追加对方（医护人员）的一条消息
    pub fn add_counterpart_message(&self, text: &str) -> ConversationEntry {
        let entry = ConversationEntry::counterpart(text);
        let mut core = self.core.lock();
        core.log.append(entry.clone());
        core.info.touch();
        entry
    }

    /// 采样一帧：分类、记录、评估，必要时造句
    pub async fn tick(&self, frame: &Frame) -> TickOutcome {
        let epoch = {
            let core = self.core.lock();
            if core.info.status != SessionStatus::Active {
                return TickOutcome::Inactive;
            }
            core.epoch
        };

        let detection = self.adapter.detect(frame).await;
        self.apply(detection, epoch).await
    }

    /// 直接提交一个已分类的检测结果
    pub async fn observe(&self, detection: Detection) -> TickOutcome {
        let epoch = self.core.lock().epoch;
        self.apply(Some(detection), epoch).await
    }

    /// 提交分类器对一帧的原始输出
    pub async fn observe_predictions(&self, predictions: Vec<Prediction>) -> TickOutcome {
        let epoch = self.core.lock().epoch;
        self.apply(top_detection(predictions), epoch).await
    }

    async fn apply(&self, detection: Option<Detection>, epoch: u64) -> TickOutcome {
        let batch = {
            let mut core = self.core.lock();
            if !core.is_current(epoch) {
                return TickOutcome::Inactive;
            }
            core.info.stats.ticks += 1;

            let Some(detection) = detection else {
                return TickOutcome::NoDetection;
            };

            if !core.buffer.record(&detection.label, detection.confidence) {
                return TickOutcome::Rejected(detection);
            }
            core.info.stats.detections_recorded += 1;
            core.info.touch();
            if let Some(metrics) = &self.metrics {
                metrics.record_detection();
            }

            let snapshot = core.buffer.snapshot();
            match core.trigger.evaluate(&snapshot, Instant::now()) {
                Some(batch) => batch,
                None => return TickOutcome::Recorded,
            }
        };

        self.compose_batch(batch, epoch).await
    }

    async fn compose_batch(&self, batch: Vec<GestureLabel>, epoch: u64) -> TickOutcome {
        let mut guard = ComposingGuard {
            controller: self,
            epoch,
            armed: true,
        };

        let phrases = self.mapper.map_labels(&batch);
        let composition = self.composer.compose_detailed(&phrases).await;
        guard.armed = false;

        let mut core = self.core.lock();
        if !core.is_current(epoch) {
            debug!("Discarding sentence composed for a stale session epoch");
            return TickOutcome::Discarded;
        }

        if composition.text.is_empty() {
            core.trigger.abort();
            return TickOutcome::Recorded;
        }

        core.trigger.complete(&batch, Instant::now());
        if self.config.clear_after_fire {
            core.buffer.clear();
        }

        let from_template = composition.source == CompositionSource::Template;
        let entry = ConversationEntry::subject(composition.text);
        core.log.append(entry.clone());
        core.info.stats.sentences_composed += 1;
        if from_template {
            core.info.stats.fallback_compositions += 1;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_sentence(from_template);
        }

        info!(
            session_id = %core.info.id,
            labels = batch.len(),
            template = from_template,
            "Composed sentence"
        );
        TickOutcome::Composed(entry)
    }

    /// 按 `sampling_interval` 周期采样，上一帧处理完之前不会开始下一帧
    pub fn spawn_sampling(self: &Arc<Self>, source: Arc<dyn FrameSource>) -> SamplingHandle {
        let controller = Arc::clone(self);
        let period = self.config.sampling_interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !controller.is_active() {
                    break;
                }
                let Some(frame) = source.next_frame().await else {
                    continue;
                };
                let outcome = controller.tick(&frame).await;
                debug!(?outcome, "Sampling tick");
            }
        });

        SamplingHandle {
            controller: Arc::clone(self),
            task,
        }
    }
}

/// 造句 future 被中途丢弃时把触发器恢复为 Idle
struct ComposingGuard<'a> {
    controller: &'a SessionController,
    epoch: u64,
    armed: bool,
}

impl Drop for ComposingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut core = self.controller.core.lock();
        if core.epoch == self.epoch {
            core.trigger.abort();
        }
    }
}

/// 周期采样任务的句柄
pub struct SamplingHandle {
    controller: Arc<SessionController>,
    task: JoinHandle<()>,
}

impl SamplingHandle {
    /// 停止会话并取消采样任务
    pub fn stop(self) {
        self.controller.stop();
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ScriptedClassifier;
    use crate::error::Result;
    use crate::generation::{GenerationOptions, TextGenerator};
    use crate::models::Role;
    use crate::services::composer::FixedSelector;
    use crate::services::trigger::CooldownPolicy;
    use async_trait::async_trait;
    use std::time::Duration;

    fn pipeline(policy: CooldownPolicy, clear_after_fire: bool) -> PipelineConfig {
        PipelineConfig {
            confidence_threshold: 0.5,
            buffer_capacity: 15,
            min_to_fire: 3,
            cooldown_policy: policy,
            clear_after_fire,
            ..PipelineConfig::default()
        }
    }

    fn controller(config: PipelineConfig) -> SessionController {
        SessionController::new(
            SessionInfo::with_id("test"),
            config,
            Arc::new(ScriptedClassifier::new()),
            SentenceComposer::template_only(Arc::new(FixedSelector::new(0))),
        )
    }

    async fn feed(controller: &SessionController, labels: &[&str]) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for label in labels {
            outcomes.push(controller.observe(Detection::new(*label, 0.9)).await);
        }
        outcomes
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_on_third_detection() {
        let session = controller(pipeline(CooldownPolicy::Strict, false));
        let outcomes = feed(&session, &["Pain", "Pain", "cough"]).await;

        assert_eq!(outcomes[0], TickOutcome::Recorded);
        assert_eq!(outcomes[1], TickOutcome::Recorded);
        let TickOutcome::Composed(entry) = &outcomes[2] else {
            panic!("expected a sentence, got {:?}", outcomes[2]);
        };
        assert_eq!(entry.role, Role::Subject);
        assert_eq!(
            entry.text,
            "I am experiencing pain and a cough and I need something for the pain."
        );
        assert_eq!(session.snapshot().conversation.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_cooldown_blocks_fourth_detection() {
        let session = controller(pipeline(CooldownPolicy::Strict, false));
        feed(&session, &["Pain", "Pain", "cough"]).await;

        let outcome = session.observe(Detection::new("Fever", 0.9)).await;
        assert_eq!(outcome, TickOutcome::Recorded);
        assert_eq!(session.snapshot().conversation.len(), 1);

        tokio::time::advance(Duration::from_millis(3100)).await;
        let outcome = session.observe(Detection::new("Fever", 0.9)).await;
        assert!(matches!(outcome, TickOutcome::Composed(_)));
        assert_eq!(session.snapshot().conversation.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_novelty_waiver_fires_fourth_detection() {
        let session = controller(pipeline(CooldownPolicy::NoveltyOverrides, false));
        feed(&session, &["Pain", "Pain", "cough"]).await;

        let outcome = session.observe(Detection::new("Fever", 0.9)).await;
        let TickOutcome::Composed(entry) = outcome else {
            panic!("expected the novel label to bypass the cooldown");
        };
        assert!(entry.text.contains("fever"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_after_fire_empties_buffer() {
        let session = controller(pipeline(CooldownPolicy::NoveltyOverrides, true));
        feed(&session, &["Pain", "Pain", "cough"]).await;
        assert!(session.snapshot().buffer.is_empty());

        // A single new label cannot reach min_to_fire on its own.
        let outcome = session.observe(Detection::new("Fever", 0.9)).await;
        assert_eq!(outcome, TickOutcome::Recorded);
        assert_eq!(session.snapshot().buffer, vec![GestureLabel::new("Fever")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_detections_do_not_count() {
        let session = controller(pipeline(CooldownPolicy::Strict, true));
        let outcome = session.observe(Detection::new("Pain", 0.3)).await;
        assert!(matches!(outcome, TickOutcome::Rejected(_)));

        let outcome = session.observe(Detection::new("nothing", 0.99)).await;
        assert!(matches!(outcome, TickOutcome::Rejected(_)));

        let snapshot = session.snapshot();
        assert!(snapshot.buffer.is_empty());
        assert_eq!(snapshot.info.stats.ticks, 2);
        assert_eq!(snapshot.info.stats.detections_recorded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversation_never_exceeds_capacity() {
        let session = controller(pipeline(CooldownPolicy::Strict, true));
        let symptoms = ["Pain", "Fever", "cough", "Dizzy", "HighBP", "Nausea", "Chills", "Fatigue"];
        for symptom in symptoms.iter().cycle().take(40) {
            feed(&session, &[*symptom, *symptom, *symptom]).await;
            tokio::time::advance(Duration::from_secs(4)).await;
            assert!(session.snapshot().conversation.len() <= 6);
        }
        assert_eq!(session.snapshot().conversation.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_everything() {
        let session = controller(pipeline(CooldownPolicy::Strict, false));
        feed(&session, &["Pain", "Pain", "cough", "Fever"]).await;
        session.add_counterpart_message("Where does it hurt?");
        session.clear();

        let snapshot = session.snapshot();
        assert!(snapshot.buffer.is_empty());
        assert!(snapshot.conversation.is_empty());
        assert_eq!(snapshot.phase, TriggerPhase::Idle);

        // Trigger state is back to its initial values: the same labels fire again.
        let outcomes = feed(&session, &["Pain", "Pain", "cough"]).await;
        assert!(matches!(outcomes[2], TickOutcome::Composed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_session_ignores_detections() {
        let session = controller(pipeline(CooldownPolicy::Strict, false));
        session.stop();
        assert_eq!(
            session.observe(Detection::new("Pain", 0.9)).await,
            TickOutcome::Inactive
        );

        session.start();
        assert_eq!(
            session.observe(Detection::new("Pain", 0.9)).await,
            TickOutcome::Recorded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_uses_classifier() {
        let classifier = Arc::new(ScriptedClassifier::new());
        classifier.push(vec![Prediction::new("Pain", 0.2), Prediction::new("Fever", 0.7)]);
        classifier.push_failure("camera frame dropped");

        let session = SessionController::new(
            SessionInfo::with_id("tick"),
            pipeline(CooldownPolicy::Strict, false),
            classifier,
            SentenceComposer::template_only(Arc::new(FixedSelector::new(0))),
        );

        assert_eq!(session.tick(&Frame::empty()).await, TickOutcome::Recorded);
        assert_eq!(session.tick(&Frame::empty()).await, TickOutcome::NoDetection);
        assert_eq!(session.snapshot().buffer, vec![GestureLabel::new("Fever")]);
    }

    /// 造句期间阻塞，直到测试放行
    struct GatedGenerator {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl TextGenerator for GatedGenerator {
        async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<String> {
            self.gate.notified().await;
            Ok("I am in pain and need a doctor.".to_string())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn gated_controller(generator: Arc<GatedGenerator>) -> Arc<SessionController> {
        Arc::new(SessionController::new(
            SessionInfo::with_id("gated"),
            pipeline(CooldownPolicy::NoveltyOverrides, false),
            Arc::new(ScriptedClassifier::new()),
            SentenceComposer::new(Some(generator), Arc::new(FixedSelector::new(0))),
        ))
    }

    #[tokio::test]
    async fn test_no_second_composition_while_composing() {
        let generator = Arc::new(GatedGenerator {
            gate: tokio::sync::Notify::new(),
        });
        let session = gated_controller(generator.clone());
        feed(&session, &["Pain", "Pain"]).await;

        let in_flight = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.observe(Detection::new("cough", 0.9)).await })
        };
        while session.snapshot().phase != TriggerPhase::Composing {
            tokio::task::yield_now().await;
        }

        // Detections keep accumulating but cannot start another composition.
        let outcome = session.observe(Detection::new("Fever", 0.9)).await;
        assert_eq!(outcome, TickOutcome::Recorded);
        assert_eq!(session.snapshot().buffer.len(), 4);

        generator.gate.notify_one();
        let outcome = in_flight.await.unwrap();
        let TickOutcome::Composed(entry) = outcome else {
            panic!("expected composition to finish");
        };
        assert_eq!(entry.text, "I am in pain and need a doctor.");
        assert_eq!(session.snapshot().conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_discards_in_flight_composition() {
        let generator = Arc::new(GatedGenerator {
            gate: tokio::sync::Notify::new(),
        });
        let session = gated_controller(generator.clone());
        feed(&session, &["Pain", "Pain"]).await;

        let in_flight = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.observe(Detection::new("cough", 0.9)).await })
        };
        while session.snapshot().phase != TriggerPhase::Composing {
            tokio::task::yield_now().await;
        }

        session.stop();
        generator.gate.notify_one();

        assert_eq!(in_flight.await.unwrap(), TickOutcome::Discarded);
        let snapshot = session.snapshot();
        assert!(snapshot.conversation.is_empty());
        assert_eq!(snapshot.info.status, SessionStatus::Stopped);
        assert_eq!(snapshot.phase, TriggerPhase::Idle);
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_composition() {
        let generator = Arc::new(GatedGenerator {
            gate: tokio::sync::Notify::new(),
        });
        let session = gated_controller(generator.clone());
        feed(&session, &["Pain", "Pain"]).await;

        let in_flight = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.observe(Detection::new("cough", 0.9)).await })
        };
        while session.snapshot().phase != TriggerPhase::Composing {
            tokio::task::yield_now().await;
        }

        session.clear();
        generator.gate.notify_one();

        assert_eq!(in_flight.await.unwrap(), TickOutcome::Discarded);
        let snapshot = session.snapshot();
        assert!(snapshot.conversation.is_empty());
        assert!(snapshot.buffer.is_empty());
        assert_eq!(snapshot.info.status, SessionStatus::Active);
        assert_eq!(snapshot.phase, TriggerPhase::Idle);

        // 清空后的会话从零开始累积
        let outcomes = feed(&session, &["Fever", "Fever"]).await;
        assert_eq!(outcomes, vec![TickOutcome::Recorded, TickOutcome::Recorded]);
    }

    #[tokio::test]
    async fn test_dropped_composition_releases_trigger() {
        let generator = Arc::new(GatedGenerator {
            gate: tokio::sync::Notify::new(),
        });
        let session = gated_controller(generator);
        feed(&session, &["Pain", "Pain"]).await;

        let in_flight = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.observe(Detection::new("cough", 0.9)).await })
        };
        while session.snapshot().phase != TriggerPhase::Composing {
            tokio::task::yield_now().await;
        }

        in_flight.abort();
        let _ = in_flight.await;
        assert_eq!(session.snapshot().phase, TriggerPhase::Idle);
    }

    struct BlankFrames;

    #[async_trait]
    impl FrameSource for BlankFrames {
        async fn next_frame(&self) -> Option<Frame> {
            Some(Frame::empty())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_loop_runs_until_stopped() {
        let classifier = Arc::new(ScriptedClassifier::from_labels(
            &["Pain", "Pain", "cough", "Fever"],
            0.9,
        ));
        let session = Arc::new(SessionController::new(
            SessionInfo::with_id("sampling"),
            pipeline(CooldownPolicy::Strict, true),
            classifier.clone(),
            SentenceComposer::template_only(Arc::new(FixedSelector::new(0))),
        ));

        let handle = session.spawn_sampling(Arc::new(BlankFrames));
        for _ in 0..4 {
            tokio::time::sleep(session.config().sampling_interval()).await;
        }

        assert_eq!(classifier.remaining(), 0);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.conversation.len(), 1);
        assert_eq!(snapshot.buffer, vec![GestureLabel::new("Fever")]);

        handle.stop();
        assert!(!session.is_active());
    }
}
