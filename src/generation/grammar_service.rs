//! 语法纠错微服务客户端
//!
//! 服务接收 `{"text": "gec: ..."}`，返回 `{"input": ..., "beautified": ...}`。

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{GenerationOptions, TextGenerator};
use crate::error::{AppError, Result};

/// 语法纠错模型要求的任务前缀
pub const TASK_PREFIX: &str = "gec: ";

pub struct GrammarServiceGenerator {
    client: reqwest::Client,
    base_url: String,
    ready: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct BeautifyResponse {
    #[allow(dead_code)]
    input: String,
    beautified: String,
}

impl GrammarServiceGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ready: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl TextGenerator for GrammarServiceGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        // 服务端固定使用 beam search 和 128 的长度上限
        debug!(
            "Grammar service ignores generation options: {:?}",
            options
        );

        let response = self
            .client
            .post(format!("{}/beautify", self.base_url))
            .json(&serde_json::json!({ "text": format!("{}{}", TASK_PREFIX, prompt) }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Grammar service failed: {}",
                error_text
            )));
        }

        let body: BeautifyResponse = response.json().await?;
        Ok(body.beautified.trim().to_string())
    }

    async fn probe(&self) -> Result<()> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Connection(format!(
                "Grammar service probe returned {}",
                response.status()
            )));
        }

        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "grammar_service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_prefixes_task_marker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/beautify"))
            .and(body_json(serde_json::json!({ "text": "gec: i has fever" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "input": "gec: i has fever",
                "beautified": "I have a fever."
            })))
            .mount(&server)
            .await;

        let generator = GrammarServiceGenerator::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let text = generator
            .generate("i has fever", GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(text, "I have a fever.");
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let generator = GrammarServiceGenerator::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(generator.probe().await, Err(AppError::Connection(_))));
        assert!(!generator.is_available());
    }
}
