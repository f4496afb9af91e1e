//! 症状映射
//!
//! 把分类器的原始手势标签翻译成可读的症状短语。表中没有的标签原样返回。

use crate::models::GestureLabel;

/// 手势标签到症状短语的固定映射表
///
/// 标签的大小写与分类器模型的类别名一致。
const SYMPTOM_TABLE: &[(&str, &str)] = &[
    ("Pain", "pain"),
    ("Headache", "a headache"),
    ("ChestPain", "chest pain"),
    ("StomachAche", "a stomach ache"),
    ("BackPain", "back pain"),
    ("Fever", "fever"),
    ("Chills", "chills"),
    ("cough", "a cough"),
    ("ShortnessOfBreath", "shortness of breath"),
    ("SoreThroat", "a sore throat"),
    ("Dizzy", "dizziness"),
    ("Nausea", "nausea"),
    ("HighBP", "high blood pressure"),
    ("LowBP", "low blood pressure"),
    ("Fatigue", "fatigue"),
];

/// 症状映射器，无状态
#[derive(Debug, Clone, Copy, Default)]
pub struct SymptomMapper;

impl SymptomMapper {
    pub fn new() -> Self {
        Self
    }

    /// 查表翻译，未知标签原样返回
    pub fn map_label(&self, label: &str) -> String {
        SYMPTOM_TABLE
            .iter()
            .find(|(key, _)| *key == label)
            .map(|(_, phrase)| phrase.to_string())
            .unwrap_or_else(|| label.to_string())
    }

    /// 批量翻译，保持输入顺序
    pub fn map_labels(&self, labels: &[GestureLabel]) -> Vec<String> {
        labels.iter().map(|l| self.map_label(l.as_str())).collect()
    }

    pub fn is_known(&self, label: &str) -> bool {
        SYMPTOM_TABLE.iter().any(|(key, _)| *key == label)
    }

    /// 分类器可识别的全部症状手势（不含 "nothing"）
    pub fn known_labels(&self) -> Vec<GestureLabel> {
        SYMPTOM_TABLE
            .iter()
            .map(|(key, _)| GestureLabel::new(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Pain", "pain")]
    #[case("cough", "a cough")]
    #[case("HighBP", "high blood pressure")]
    #[case("unknown_xyz", "unknown_xyz")]
    #[case("pain", "pain")]
    #[case("", "")]
    fn test_map_label(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(SymptomMapper::new().map_label(label), expected);
    }

    #[test]
    fn test_map_labels_keeps_order() {
        let labels = vec![GestureLabel::new("Fever"), GestureLabel::new("Dizzy")];
        assert_eq!(
            SymptomMapper::new().map_labels(&labels),
            vec!["fever".to_string(), "dizziness".to_string()]
        );
    }

    #[test]
    fn test_known_labels_exclude_nothing() {
        let mapper = SymptomMapper::new();
        assert!(mapper.is_known("Pain"));
        assert!(!mapper.is_known("nothing"));
        assert!(!mapper.known_labels().iter().any(|l| l.is_nothing()));
    }
}
