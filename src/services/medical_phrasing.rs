//! 医疗短语服务
//!
//! 语法纠错微服务的服务端逻辑：把手语识别出的零散词语按类别组合成医疗场景下的句子，
//! 规则无法覆盖时交给语法纠错模型。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::generation::{GenerationOptions, TextGenerator};

/// 空输入时的回复
pub const NO_SIGNS_MESSAGE: &str = "No medical signs detected";

/// 参与组句的最大唯一词数
const MAX_UNIQUE_WORDS: usize = 7;

/// 语法纠错模型的生成长度上限
const CORRECTION_MAX_LENGTH: usize = 128;

const SYMPTOM_WORDS: &[&str] = &[
    "pain", "headache", "fever", "nausea", "dizzy", "tired", "cough", "cold", "flu", "throat",
    "chest", "breathing", "stomach", "back", "knee", "shoulder", "hurt", "sick", "bad", "worse",
];
const TREATMENT_WORDS: &[&str] = &[
    "medication", "treatment", "surgery", "prescription", "recovery", "medicine", "help",
    "better",
];
const PERSONNEL_WORDS: &[&str] = &["doctor", "nurse", "hospital", "emergency"];
const BODY_PART_WORDS: &[&str] = &["heart", "lungs", "throat", "blood", "pressure", "head", "body"];
const ACTION_WORDS: &[&str] = &[
    "need", "want", "go", "get", "make", "cannot", "sleep", "wake", "work", "move", "walk",
    "swallow", "spin",
];
const TIME_WORDS: &[&str] = &[
    "yesterday", "today", "morning", "night", "week", "now", "start", "continue",
];
const SEVERITY_WORDS: &[&str] = &["very", "too", "much", "high", "hard", "urgent"];
const LOCATION_WORDS: &[&str] = &["pharmacy", "hospital", "emergency", "room"];

/// 按类别归类后的词语，每个词只进入第一个匹配的类别
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WordCategories {
    pub symptoms: Vec<String>,
    pub treatments: Vec<String>,
    pub personnel: Vec<String>,
    pub body_parts: Vec<String>,
    pub actions: Vec<String>,
    pub time_words: Vec<String>,
    pub severity: Vec<String>,
    pub locations: Vec<String>,
}

impl WordCategories {
    pub fn categorize(words: &[String]) -> Self {
        let mut categories = Self::default();
        for word in words {
            let w = word.as_str();
            let bucket = if SYMPTOM_WORDS.contains(&w) {
                &mut categories.symptoms
            } else if TREATMENT_WORDS.contains(&w) {
                &mut categories.treatments
            } else if PERSONNEL_WORDS.contains(&w) {
                &mut categories.personnel
            } else if BODY_PART_WORDS.contains(&w) {
                &mut categories.body_parts
            } else if ACTION_WORDS.contains(&w) {
                &mut categories.actions
            } else if TIME_WORDS.contains(&w) {
                &mut categories.time_words
            } else if SEVERITY_WORDS.contains(&w) {
                &mut categories.severity
            } else if LOCATION_WORDS.contains(&w) {
                &mut categories.locations
            } else {
                continue;
            };
            bucket.push(word.clone());
        }
        categories
    }

    fn has_treatment(&self, word: &str) -> bool {
        self.treatments.iter().any(|t| t == word)
    }

    fn needs_medication(&self) -> bool {
        self.has_treatment("medication") || self.has_treatment("medicine")
    }
}

/// 保序去重
pub fn distinct_words(words: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    words
        .iter()
        .filter(|w| seen.insert(w.as_str()))
        .cloned()
        .collect()
}

/// 保序去重，最多保留 `MAX_UNIQUE_WORDS` 个
pub fn unique_words(words: &[String]) -> Vec<String> {
    let mut unique = distinct_words(words);
    unique.truncate(MAX_UNIQUE_WORDS);
    unique
}

fn list(words: &[String], n: usize) -> String {
    words.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

/// 基础组句规则，没有规则命中时返回 `None`
fn basic_sentence(c: &WordCategories) -> Option<String> {
    let sentence = if !c.symptoms.is_empty() && !c.treatments.is_empty() {
        format!("I have {} and need {}", list(&c.symptoms, 3), list(&c.treatments, 2))
    } else if !c.symptoms.is_empty() && !c.personnel.is_empty() {
        format!("I have {} and need to see a {}", list(&c.symptoms, 3), c.personnel[0])
    } else if !c.symptoms.is_empty() && !c.body_parts.is_empty() {
        format!("I have {} in my {}", list(&c.symptoms, 2), list(&c.body_parts, 2))
    } else if !c.symptoms.is_empty() {
        format!("I am experiencing {}", list(&c.symptoms, 4))
    } else if !c.treatments.is_empty() {
        format!("I need {}", list(&c.treatments, 3))
    } else if !c.personnel.is_empty() {
        format!("I need to see a {}", c.personnel[0])
    } else {
        return None;
    };
    Some(sentence)
}

/// 结构化词表的组句规则，覆盖常见的手语语序
fn structured_sentence(unique: &[String], c: &WordCategories) -> Option<String> {
    let needs = c.actions.iter().any(|a| a == "need");

    if unique.len() == 3 && needs && c.symptoms.iter().any(|s| s == "pain") {
        if c.needs_medication() {
            return Some("I need medication for pain".to_string());
        }
        if let Some(location) = c.locations.first() {
            return Some(format!("I need medication from {} for pain", location));
        }
    }

    if needs && c.needs_medication() {
        if let Some(location) = c.locations.first() {
            return Some(format!("I need medication from {}", location));
        }
    }

    let has = |v: &Vec<String>| !v.is_empty();
    let sentence = if has(&c.actions) && has(&c.symptoms) && has(&c.personnel) {
        format!(
            "I {} help for {} and {} to see a {}",
            c.actions[0],
            list(&c.symptoms, 2),
            c.actions[0],
            c.personnel[0]
        )
    } else if has(&c.actions) && has(&c.symptoms) && has(&c.treatments) {
        format!(
            "I {} {} for {}",
            c.actions[0],
            list(&c.treatments, 2),
            list(&c.symptoms, 2)
        )
    } else if has(&c.symptoms) && has(&c.treatments) && has(&c.personnel) {
        format!(
            "I have {} and need {} from a {}",
            list(&c.symptoms, 2),
            list(&c.treatments, 1),
            c.personnel[0]
        )
    } else if has(&c.symptoms) && has(&c.treatments) {
        format!("I have {} and need {}", list(&c.symptoms, 3), list(&c.treatments, 2))
    } else if has(&c.symptoms) && has(&c.personnel) {
        format!("I have {} and need to see a {}", list(&c.symptoms, 3), c.personnel[0])
    } else if has(&c.symptoms) && has(&c.body_parts) {
        format!("I have {} in my {}", list(&c.symptoms, 2), list(&c.body_parts, 2))
    } else if has(&c.actions) && has(&c.symptoms) {
        format!("I {} help for {}", c.actions[0], list(&c.symptoms, 3))
    } else if has(&c.actions) && has(&c.treatments) {
        format!("I {} {}", c.actions[0], list(&c.treatments, 3))
    } else if has(&c.symptoms) {
        format!("I am experiencing {}", list(&c.symptoms, 4))
    } else if has(&c.treatments) {
        format!("I need {}", list(&c.treatments, 3))
    } else if has(&c.personnel) {
        format!("I need to see a {}", c.personnel[0])
    } else {
        return None;
    };
    Some(sentence)
}

#[async_trait]
pub trait PhrasingService: Send + Sync {
    /// 直接做语法纠错，没有可用模型时报错
    async fn correct_grammar(&self, text: &str) -> Result<String>;

    /// 对自由文本组句，超过三个词时再做一次纠错
    async fn beautify_sentence(&self, text: &str) -> Result<String>;

    /// 对结构化词表组句
    async fn process_words(&self, words: &[String], context: &str) -> Result<String>;
}

pub struct MedicalPhrasingService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl MedicalPhrasingService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    fn available_generator(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.generator.as_ref().filter(|g| g.is_available())
    }

    /// 规则未命中时的兜底：有模型就纠错，否则原样拼接
    async fn correct_or_passthrough(&self, text: &str) -> String {
        if self.available_generator().is_none() {
            debug!("No grammar model available, returning words as-is");
            return text.to_string();
        }

        match self.correct_grammar(text).await {
            Ok(corrected) if !corrected.trim().is_empty() => corrected,
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!("Grammar correction failed, returning words as-is: {}", e);
                text.to_string()
            }
        }
    }

    async fn medical_sentence(&self, words: &[String]) -> String {
        if words.is_empty() {
            return NO_SIGNS_MESSAGE.to_string();
        }

        let unique = unique_words(words);
        let categories = WordCategories::categorize(&unique);
        match basic_sentence(&categories) {
            Some(sentence) => sentence,
            None => self.correct_or_passthrough(&unique.join(" ")).await,
        }
    }
}

#[async_trait]
impl PhrasingService for MedicalPhrasingService {
    async fn correct_grammar(&self, text: &str) -> Result<String> {
        let generator = self
            .available_generator()
            .ok_or_else(|| AppError::GeneratorUnavailable("no grammar model configured".into()))?;

        generator
            .generate(
                text,
                GenerationOptions {
                    max_length: CORRECTION_MAX_LENGTH,
                    deterministic: true,
                },
            )
            .await
    }

    async fn beautify_sentence(&self, text: &str) -> Result<String> {
        let words: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let sentence = self.medical_sentence(&words).await;
        if words.len() <= 3 {
            return Ok(sentence);
        }
        Ok(self.correct_or_passthrough(&sentence).await)
    }

    async fn process_words(&self, words: &[String], context: &str) -> Result<String> {
        debug!("Processing {} word(s) in {} context", words.len(), context);
        if words.is_empty() {
            return Ok(NO_SIGNS_MESSAGE.to_string());
        }

        let normalized: Vec<String> = words.iter().map(|w| w.trim().to_lowercase()).collect();
        let unique = unique_words(&normalized);
        let categories = WordCategories::categorize(&unique);
        match structured_sentence(&unique, &categories) {
            Some(sentence) => Ok(sentence),
            None => Ok(self.correct_or_passthrough(&unique.join(" ")).await),
        }
    }
}

pub fn create_phrasing_service(
    generator: Option<Arc<dyn TextGenerator>>,
) -> Box<dyn PhrasingService> {
    Box::new(MedicalPhrasingService::new(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    struct UppercaseGenerator;

    #[async_trait]
    impl TextGenerator for UppercaseGenerator {
        async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
            assert_eq!(options.max_length, CORRECTION_MAX_LENGTH);
            Ok(prompt.to_uppercase())
        }

        fn name(&self) -> &str {
            "uppercase"
        }
    }

    #[rstest]
    #[case(&["need", "pain", "medication"], "I need medication for pain")]
    #[case(&["pain", "need", "medicine"], "I need medication for pain")]
    #[case(&["need", "medication", "pharmacy"], "I need medication from pharmacy")]
    #[case(&["need", "pain", "medication", "pharmacy"], "I need medication from pharmacy")]
    #[case(&["need", "doctor", "help"], "I need help")]
    #[case(&["fever", "high", "body"], "I have fever in my body")]
    #[case(&["stomach", "pain", "nausea"], "I am experiencing stomach, pain, nausea")]
    #[case(&["want", "nurse", "now"], "I need to see a nurse")]
    #[case(&["cough", "throat", "hurt"], "I am experiencing cough, throat, hurt")]
    #[case(&["chest", "pain", "breathing"], "I am experiencing chest, pain, breathing")]
    #[case(&["cannot", "work", "sick"], "I cannot help for sick")]
    #[case(&["surgery", "need", "doctor"], "I need surgery")]
    #[case(&["pain", "pain", "doctor"], "I have pain and need to see a doctor")]
    #[case(&["Fever", " cough "], "I am experiencing fever, cough")]
    #[tokio::test]
    async fn test_process_words(#[case] input: &[&str], #[case] expected: &str) {
        let service = MedicalPhrasingService::new(None);
        let sentence = service.process_words(&words(input), "medical").await.unwrap();
        assert_eq!(sentence, expected);
    }

    #[tokio::test]
    async fn test_process_words_empty() {
        let service = MedicalPhrasingService::new(None);
        assert_eq!(
            service.process_words(&[], "medical").await.unwrap(),
            NO_SIGNS_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_unmatched_words_use_grammar_model() {
        let service = MedicalPhrasingService::new(Some(Arc::new(UppercaseGenerator)));
        let sentence = service
            .process_words(&words(&["yesterday", "very", "yesterday"]), "medical")
            .await
            .unwrap();
        assert_eq!(sentence, "YESTERDAY VERY");
    }

    #[tokio::test]
    async fn test_unmatched_words_without_model_pass_through() {
        let service = MedicalPhrasingService::new(None);
        let sentence = service
            .process_words(&words(&["today", "morning"]), "medical")
            .await
            .unwrap();
        assert_eq!(sentence, "today morning");
    }

    #[tokio::test]
    async fn test_beautify_short_text_skips_model() {
        let service = MedicalPhrasingService::new(Some(Arc::new(UppercaseGenerator)));
        let sentence = service.beautify_sentence("Pain head bad").await.unwrap();
        assert_eq!(sentence, "I have pain, bad in my head");
    }

    #[tokio::test]
    async fn test_beautify_long_text_uses_model() {
        let service = MedicalPhrasingService::new(Some(Arc::new(UppercaseGenerator)));
        let sentence = service
            .beautify_sentence("fever cough need doctor")
            .await
            .unwrap();
        assert_eq!(sentence, "I HAVE FEVER, COUGH AND NEED TO SEE A DOCTOR");
    }

    #[tokio::test]
    async fn test_correct_grammar_requires_model() {
        let service = MedicalPhrasingService::new(None);
        assert!(matches!(
            service.correct_grammar("i has pain").await,
            Err(AppError::GeneratorUnavailable(_))
        ));
    }

    #[test]
    fn test_unique_words_caps_at_seven() {
        let input = words(&["a", "b", "a", "c", "d", "e", "f", "g", "h"]);
        assert_eq!(unique_words(&input), words(&["a", "b", "c", "d", "e", "f", "g"]));
        assert_eq!(distinct_words(&input).len(), 8);
    }

    #[test]
    fn test_first_category_wins() {
        let categories = WordCategories::categorize(&words(&["throat", "hospital"]));
        assert_eq!(categories.symptoms, words(&["throat"]));
        assert_eq!(categories.personnel, words(&["hospital"]));
        assert!(categories.body_parts.is_empty());
        assert!(categories.locations.is_empty());
    }
}
