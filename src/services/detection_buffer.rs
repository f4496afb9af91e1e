//! 检测缓冲区
//!
//! 按时间顺序保存最近 K 个被接受的手势标签，溢出时从队首淘汰。

use std::collections::VecDeque;

use crate::models::GestureLabel;

/// 有界的检测历史
#[derive(Debug, Clone)]
pub struct DetectionBuffer {
    labels: VecDeque<GestureLabel>,
    capacity: usize,
    threshold: f32,
}

impl DetectionBuffer {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            labels: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
        }
    }

    /// 记录一次检测
    ///
    /// 仅当 `confidence > threshold` 且标签不是 "nothing" 时追加。
    /// 超出 [0, 1] 或 NaN 的置信度按低于阈值处理。返回是否追加。
    pub fn record(&mut self, label: &GestureLabel, confidence: f32) -> bool {
        if !self.accepts(label, confidence) {
            return false;
        }

        self.labels.push_back(label.clone());
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
        true
    }

    fn accepts(&self, label: &GestureLabel, confidence: f32) -> bool {
        (0.0..=1.0).contains(&confidence) && confidence > self.threshold && !label.is_nothing()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// 当前内容的只读副本（从旧到新）
    pub fn snapshot(&self) -> Vec<GestureLabel> {
        self.labels.iter().cloned().collect()
    }

    /// 最近的 n 个标签（从旧到新）
    pub fn recent(&self, n: usize) -> Vec<GestureLabel> {
        let skip = self.labels.len().saturating_sub(n);
        self.labels.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
