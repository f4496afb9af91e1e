//! Ollama 文本生成客户端

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{GenerationOptions, TextGenerator};
use crate::error::{AppError, Result};

/// 让模型只做语法润色，不添加新内容
const SYSTEM_PROMPT: &str = "You correct the grammar of a patient's sentence. \
Reply with the corrected sentence only, without quotes or explanations.";

pub struct OllamaTextGenerator {
    client: reqwest::Client,
    model_name: String,
    base_url: String,
    ready: AtomicBool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaTextGenerator {
    pub fn new(base_url: &str, model_name: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            model_name: model_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ready: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaTextGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let mut model_options = serde_json::json!({ "num_predict": options.max_length });
        if options.deterministic {
            model_options["temperature"] = serde_json::json!(0.0);
            model_options["top_k"] = serde_json::json!(1);
        }

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model_name,
                "system": SYSTEM_PROMPT,
                "prompt": prompt,
                "stream": false,
                "options": model_options,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Ollama generation failed: {}",
                error_text
            )));
        }

        let generated: OllamaGenerateResponse = response.json().await?;
        debug!("Ollama generated {} chars", generated.response.len());
        Ok(generated.response.trim().to_string())
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Connection(format!(
                "Ollama probe returned {}",
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
        "ollama"
    }
}
