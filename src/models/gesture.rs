//! 手势标签与检测结果
//!
//! 分类器对每一帧输出若干 `(label, probability)`，这里把它们收敛为
//! 强类型的 [`Prediction`] 与 [`Detection`]。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// "无手势"标签的取值
pub const NOTHING_LABEL: &str = "nothing";

/// 手势标签
///
/// 按值比较，克隆只复制引用计数。大小写敏感，与分类器输出保持一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureLabel(Arc<str>);

impl GestureLabel {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    /// 特殊的"无手势"标签
    pub fn nothing() -> Self {
        Self::new(NOTHING_LABEL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_nothing(&self) -> bool {
        &*self.0 == NOTHING_LABEL
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GestureLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for GestureLabel {
    fn from(label: String) -> Self {
        Self(Arc::from(label))
    }
}

impl AsRef<str> for GestureLabel {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for GestureLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GestureLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(GestureLabel::from)
    }
}

/// 分类器的单条输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 类别名称
    pub label: String,
    /// 概率，合法范围 [0, 1]
    pub probability: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }

    /// 概率是否落在 [0, 1] 内（NaN 视为非法）
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.probability)
    }
}

/// 单个采样周期的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: GestureLabel,
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<GestureLabel>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

impl From<Prediction> for Detection {
    fn from(prediction: Prediction) -> Self {
        Self {
            label: GestureLabel::from(prediction.label),
            confidence: prediction.probability,
        }
    }
}
