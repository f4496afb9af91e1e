//! 姿态分类器适配
//!
//! 姿态估计与手势分类模型都是外部黑盒，这里只约定窄接口：
//! 输入一帧画面，输出按类别的概率列表。适配器负责在边界上校验概率，
//! 并取出置信度最高的一项作为本帧的检测结果。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{Detection, Prediction};

/// 一帧画面，像素格式由具体分类器约定
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    /// 不含像素的占位帧
    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<Vec<Prediction>>;

    fn name(&self) -> &str {
        "classifier"
    }
}

/// 画面来源（摄像头等），返回 `None` 表示本次没有可用画面
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn next_frame(&self) -> Option<Frame>;
}

/// 从预测列表中选出置信度最高的合法项
///
/// 概率为 NaN 或超出 [0, 1] 的项被丢弃。
pub fn top_detection(predictions: Vec<Prediction>) -> Option<Detection> {
    predictions
        .into_iter()
        .filter(|p| {
            let valid = p.is_valid();
            if !valid {
                debug!(
                    "Rejected prediction {} with probability {}",
                    p.label, p.probability
                );
            }
            valid
        })
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
        .map(Detection::from)
}

/// 分类器适配器
#[derive(Clone)]
pub struct ClassifierAdapter {
    classifier: Arc<dyn Classifier>,
}

impl ClassifierAdapter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// 分类一帧，失败或没有合法结果时返回 `None`
    pub async fn detect(&self, frame: &Frame) -> Option<Detection> {
        match self.classifier.classify(frame).await {
            Ok(predictions) => top_detection(predictions),
            Err(e) => {
                warn!(
                    "Classifier {} failed, no detection this tick: {}",
                    self.classifier.name(),
                    e
                );
                None
            }
        }
    }
}

/// 分类在浏览器端完成，服务端只接收预测结果
///
/// HTTP 会话通过 `observe_predictions` 提交结果，对帧调用总是没有检测。
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientSideClassifier;

#[async_trait]
impl Classifier for ClientSideClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<Vec<Prediction>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "client_side"
    }
}

/// 按脚本回放预测结果的分类器，脚本耗尽后返回空列表
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Vec<Prediction>>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每个标签一帧，置信度相同
    pub fn from_labels(labels: &[&str], probability: f32) -> Self {
        let classifier = Self::new();
        for label in labels {
            classifier.push(vec![Prediction::new(*label, probability)]);
        }
        classifier
    }

    pub fn push(&self, predictions: Vec<Prediction>) {
        self.script.lock().push_back(Ok(predictions));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .push_back(Err(AppError::Classification(message.to_string())));
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<Vec<Prediction>> {
        self.script.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
