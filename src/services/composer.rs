//! 造句器
//!
//! 把一组症状短语变成一句话。优先交给文本生成模型润色种子句，
//! 模型不可用、调用失败或返回空串时使用模板句式。

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::generation::{GenerationOptions, TextGenerator};

/// 模板句式的开头
pub const OPENERS: [&str; 5] = [
    "I am experiencing",
    "I have been suffering from",
    "I am dealing with",
    "Right now I have",
    "I need to tell you that I have",
];

/// 结尾分类，按优先级依次匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosingCategory {
    Pain,
    Fever,
    Respiratory,
    Dizziness,
    BloodPressure,
    Generic,
}

impl ClosingCategory {
    /// 匹配优先级，`Generic` 兜底
    pub const PRIORITY: [ClosingCategory; 5] = [
        ClosingCategory::Pain,
        ClosingCategory::Fever,
        ClosingCategory::Respiratory,
        ClosingCategory::Dizziness,
        ClosingCategory::BloodPressure,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ClosingCategory::Pain => &["pain", "ache", "hurt", "sore"],
            ClosingCategory::Fever => &["fever", "temperature", "chills"],
            ClosingCategory::Respiratory => &["cough", "breath", "throat", "wheez", "lung"],
            ClosingCategory::Dizziness => &["dizz", "faint", "vertigo", "lightheaded"],
            ClosingCategory::BloodPressure => &["blood pressure"],
            ClosingCategory::Generic => &[],
        }
    }

    pub fn clause(self) -> &'static str {
        match self {
            ClosingCategory::Pain => "and I need something for the pain.",
            ClosingCategory::Fever => "and I think I am running a temperature.",
            ClosingCategory::Respiratory => "and I am finding it hard to breathe properly.",
            ClosingCategory::Dizziness => "and I feel like I might fall over.",
            ClosingCategory::BloodPressure => "and I would like my blood pressure checked.",
            ClosingCategory::Generic => "and I would like medical attention.",
        }
    }

    fn matches(self, phrases: &[String]) -> bool {
        phrases.iter().any(|phrase| {
            let phrase = phrase.to_lowercase();
            self.keywords().iter().any(|k| phrase.contains(k))
        })
    }

    /// 按优先级选出第一个匹配的分类
    pub fn classify(phrases: &[String]) -> ClosingCategory {
        Self::PRIORITY
            .into_iter()
            .find(|category| category.matches(phrases))
            .unwrap_or(ClosingCategory::Generic)
    }
}

/// 模板句式的选择策略
pub trait PhraseSelector: Send + Sync {
    /// 返回开头在 `openers` 中的下标
    fn choose_opener(&self, openers: &[&'static str]) -> usize;

    fn choose_closing(&self, phrases: &[String]) -> ClosingCategory {
        ClosingCategory::classify(phrases)
    }
}

/// 随机选择开头
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl PhraseSelector for RandomSelector {
    fn choose_opener(&self, openers: &[&'static str]) -> usize {
        if openers.is_empty() {
            return 0;
        }
        (Uuid::new_v4().as_u128() % openers.len() as u128) as usize
    }
}

/// 固定选择，测试和演示使用
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSelector {
    pub opener: usize,
    pub closing: Option<ClosingCategory>,
}

impl FixedSelector {
    pub fn new(opener: usize) -> Self {
        Self {
            opener,
            closing: None,
        }
    }
}

impl PhraseSelector for FixedSelector {
    fn choose_opener(&self, openers: &[&'static str]) -> usize {
        self.opener.min(openers.len().saturating_sub(1))
    }

    fn choose_closing(&self, phrases: &[String]) -> ClosingCategory {
        self.closing
            .unwrap_or_else(|| ClosingCategory::classify(phrases))
    }
}

/// 句子来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionSource {
    Generator,
    Template,
}

/// 造句结果
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub text: String,
    pub source: CompositionSource,
}

/// 造句器
#[derive(Clone)]
pub struct SentenceComposer {
    generator: Option<Arc<dyn TextGenerator>>,
    selector: Arc<dyn PhraseSelector>,
    options: GenerationOptions,
}

impl std::fmt::Debug for SentenceComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceComposer")
            .field(
                "generator",
                &self.generator.as_ref().map(|g| g.name().to_string()),
            )
            .field("selector", &"Arc<dyn PhraseSelector>")
            .field("options", &self.options)
            .finish()
    }
}

impl SentenceComposer {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        selector: Arc<dyn PhraseSelector>,
    ) -> Self {
        Self {
            generator,
            selector,
            options: GenerationOptions::default(),
        }
    }

    /// 只使用模板句式
    pub fn template_only(selector: Arc<dyn PhraseSelector>) -> Self {
        Self::new(None, selector)
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.as_ref().is_some_and(|g| g.is_available())
    }

    pub async fn compose(&self, phrases: &[String]) -> String {
        self.compose_detailed(phrases).await.text
    }

    /// 造句并返回句子来源，空输入返回空串
    pub async fn compose_detailed(&self, phrases: &[String]) -> Composition {
        if phrases.is_empty() {
            return Composition {
                text: String::new(),
                source: CompositionSource::Template,
            };
        }

        if let Some(generator) = self.generator.as_ref().filter(|g| g.is_available()) {
            let seed = seed_sentence(phrases);
            match generator.generate(&seed, self.options).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Composed sentence with {}", generator.name());
                    return Composition {
                        text,
                        source: CompositionSource::Generator,
                    };
                }
                Ok(_) => warn!("{} returned empty text, using template", generator.name()),
                Err(e) => warn!("{} failed, using template: {}", generator.name(), e),
            }
        }

        Composition {
            text: self.template_sentence(phrases),
            source: CompositionSource::Template,
        }
    }

    /// 模板句式：开头 + 短语 + 结尾
    pub fn template_sentence(&self, phrases: &[String]) -> String {
        if phrases.is_empty() {
            return String::new();
        }

        let opener = OPENERS[self.selector.choose_opener(&OPENERS).min(OPENERS.len() - 1)];
        let closing = self.selector.choose_closing(phrases);
        format!("{} {} {}", opener, phrases.join(" and "), closing.clause())
    }
}

/// 交给生成模型的种子句
pub fn seed_sentence(phrases: &[String]) -> String {
    format!(
        "I am experiencing {} and need medical attention",
        phrases.join(" and ")
    )
}
