//! 文本生成模块
//!
//! 造句器把症状短语拼成种子句后交给外部文本生成/语法纠错模型润色。
//! 模型是可选能力：初始化失败或超时时系统只使用模板句式，这也是合法的稳态。

pub mod grammar_service;
pub mod ollama;

pub use grammar_service::GrammarServiceGenerator;
pub use ollama::OllamaTextGenerator;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::config::GeneratorConfig;
use crate::error::{AppError, Result};

/// 生成参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    /// 最大生成长度（token）
    pub max_length: usize,
    /// 关闭采样，使用确定性解码
    pub deterministic: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_length: 64,
            deterministic: true,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String>;

    /// 预热/连通性检查
    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    /// 调用时的能力检查
    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// 初始化结果
pub enum GeneratorInit {
    Ready(Arc<dyn TextGenerator>),
    Unavailable(String),
    TimedOut(Duration),
}

impl GeneratorInit {
    pub fn into_generator(self) -> Option<Arc<dyn TextGenerator>> {
        match self {
            GeneratorInit::Ready(generator) => Some(generator),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GeneratorInit::Ready(_))
    }

    pub fn describe(&self) -> String {
        match self {
            GeneratorInit::Ready(generator) => format!("ready ({})", generator.name()),
            GeneratorInit::Unavailable(reason) => format!("unavailable: {}", reason),
            GeneratorInit::TimedOut(timeout) => format!("timed out after {:?}", timeout),
        }
    }
}

impl std::fmt::Debug for GeneratorInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// 带超时地等待生成模型就绪
pub async fn initialize_generator<F>(init: F, timeout: Duration) -> GeneratorInit
where
    F: Future<Output = Result<Arc<dyn TextGenerator>>>,
{
    match tokio::time::timeout(timeout, init).await {
        Ok(Ok(generator)) => {
            info!("Text generator ready: {}", generator.name());
            GeneratorInit::Ready(generator)
        }
        Ok(Err(e)) => {
            warn!("Text generator unavailable, using template fallback only: {}", e);
            GeneratorInit::Unavailable(e.to_string())
        }
        Err(_) => {
            warn!(
                "Text generator did not become ready within {:?}, using template fallback only",
                timeout
            );
            GeneratorInit::TimedOut(timeout)
        }
    }
}

/// 按配置创建生成模型客户端，`"none"` 返回 `None`
pub fn create_text_generator(config: &GeneratorConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    let timeout = Duration::from_secs(config.request_timeout);
    match config.backend.as_str() {
        "ollama" => {
            let generator = OllamaTextGenerator::new(&config.base_url, &config.model_name, timeout)?;
            Ok(Some(Arc::new(generator)))
        }
        "grammar_service" => {
            let generator = GrammarServiceGenerator::new(&config.base_url, timeout)?;
            Ok(Some(Arc::new(generator)))
        }
        "none" => Ok(None),
        other => Err(AppError::Config(format!(
            "Unknown generator backend: {}",
            other
        ))),
    }
}

/// 创建并预热生成模型
pub async fn connect_text_generator(config: &GeneratorConfig) -> GeneratorInit {
    let generator = match create_text_generator(config) {
        Ok(Some(generator)) => generator,
        Ok(None) => return GeneratorInit::Unavailable("disabled by configuration".into()),
        Err(e) => return GeneratorInit::Unavailable(e.to_string()),
    };

    initialize_generator(
        async move {
            generator.probe().await?;
            Ok(generator)
        },
        Duration::from_secs(config.init_timeout),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str, _options: GenerationOptions) -> Result<String> {
            Ok(prompt.to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_initialize_ready() {
        let init = initialize_generator(
            async { Ok(Arc::new(EchoGenerator) as Arc<dyn TextGenerator>) },
            Duration::from_secs(1),
        )
        .await;

        assert!(init.is_ready());
        assert_eq!(init.describe(), "ready (echo)");
    }

    #[tokio::test]
    async fn test_initialize_failure_is_structured() {
        let init = initialize_generator(
            async { Err(AppError::Connection("refused".into())) },
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(init, GeneratorInit::Unavailable(_)));
        assert!(init.into_generator().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_times_out() {
        let init = initialize_generator(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Arc::new(EchoGenerator) as Arc<dyn TextGenerator>)
            },
            Duration::from_secs(5),
        )
        .await;

        assert!(matches!(init, GeneratorInit::TimedOut(t) if t == Duration::from_secs(5)));
    }

    #[test]
    fn test_create_none_backend() {
        let config = GeneratorConfig::default();
        assert!(create_text_generator(&config).unwrap().is_none());
    }

    #[test]
    fn test_create_unknown_backend() {
        let config = GeneratorConfig {
            backend: "mystery".into(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            create_text_generator(&config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_disabled() {
        let init = connect_text_generator(&GeneratorConfig::default()).await;
        assert!(matches!(init, GeneratorInit::Unavailable(_)));
    }
}
