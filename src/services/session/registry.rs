//! 会话注册表
//!
//! HTTP 层按 ID 查找会话控制器。会话之间不共享任何状态，
//! 只共享注入的分类器、生成模型和句式选择策略。

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use super::SessionController;
use crate::classifier::Classifier;
use crate::config::config::PipelineConfig;
use crate::error::{AppError, Result};
use crate::generation::{GenerationOptions, TextGenerator};
use crate::models::SessionInfo;
use crate::observability::AppMetrics;
use crate::services::composer::{PhraseSelector, SentenceComposer};

pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionController>>,
    config: PipelineConfig,
    classifier: Arc<dyn Classifier>,
    generator: Option<Arc<dyn TextGenerator>>,
    selector: Arc<dyn PhraseSelector>,
    options: GenerationOptions,
    metrics: Arc<AppMetrics>,
}

impl SessionRegistry {
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        generator: Option<Arc<dyn TextGenerator>>,
        selector: Arc<dyn PhraseSelector>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            classifier,
            generator,
            selector,
            options: GenerationOptions::default(),
            metrics,
        }
    }

    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// 创建新会话
    pub fn create(&self) -> Arc<SessionController> {
        let info = SessionInfo::new();
        let id = info.id.clone();
        let composer = SentenceComposer::new(self.generator.clone(), self.selector.clone())
            .with_options(self.options);
        let controller = Arc::new(
            SessionController::new(info, self.config.clone(), self.classifier.clone(), composer)
                .with_metrics(self.metrics.clone()),
        );

        self.sessions.insert(id.clone(), controller.clone());
        self.metrics.record_session(1);
        info!("Session {} created", id);
        controller
    }

    pub fn get(&self, id: &str) -> Result<Arc<SessionController>> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)))
    }

    /// 删除会话，进行中的结果随之作废
    pub fn remove(&self, id: &str) -> Result<()> {
        let (_, controller) = self
            .sessions
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)))?;

        controller.stop();
        self.metrics.record_session(-1);
        info!("Session {} removed", id);
        Ok(())
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn has_generator(&self) -> bool {
        self.generator.as_ref().is_some_and(|g| g.is_available())
    }
}
