//! 语法纠错 DTO
//!
//! 语法纠错服务的请求和响应数据结构，字段名与浏览器端约定一致。

use serde::{Deserialize, Serialize};

/// 自由文本请求
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    /// 待纠错文本
    pub text: String,
}

/// 纠错响应
#[derive(Debug, Serialize, Deserialize)]
pub struct BeautifyResponse {
    /// 原始输入
    pub input: String,
    /// 纠错结果
    pub beautified: String,
}

/// 结构化词表请求
#[derive(Debug, Deserialize)]
pub struct StructuredRequest {
    /// 识别出的词语，按出现顺序
    pub words: Vec<String>,
    /// 场景，目前只有 medical
    #[serde(default = "default_context")]
    pub context: String,
    /// 客户端时间戳，原样忽略
    #[serde(default)]
    pub timestamp: String,
}

fn default_context() -> String {
    "medical".to_string()
}

/// 词表组句响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessWordsResponse {
    pub input_words: Vec<String>,
    pub context: String,
    pub beautified: String,
    pub word_count: usize,
    /// 去重后的词语，保持首次出现的顺序
    pub unique_words: Vec<String>,
}

/// 服务状态
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}
