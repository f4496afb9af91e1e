use crate::config::config::{AppConfig, PipelineConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀，嵌套字段用双下划线分隔，例如 `MEDISIGN_PIPELINE__COOLDOWN_MS`
const ENV_PREFIX: &str = "MEDISIGN_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 搜索路径：
    /// 1. 内置默认值
    /// 2. ./config.toml
    /// 3. 环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        Self::validate_pipeline(&config.pipeline)?;

        match config.generator.backend.as_str() {
            "none" | "ollama" | "grammar_service" => {}
            other => return Err(ConfigValidationError::UnknownBackend(other.to_string())),
        }

        if config.generator.backend != "none" && config.generator.base_url.is_empty() {
            return Err(ConfigValidationError::MissingGeneratorUrl);
        }

        Ok(())
    }

    /// 验证识别流水线配置
    pub fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&pipeline.confidence_threshold) {
            return Err(ConfigValidationError::InvalidThreshold(
                pipeline.confidence_threshold,
            ));
        }

        if pipeline.buffer_capacity == 0 || pipeline.conversation_capacity == 0 {
            return Err(ConfigValidationError::InvalidCapacity);
        }

        if pipeline.min_to_fire == 0 || pipeline.min_to_fire > pipeline.buffer_capacity {
            return Err(ConfigValidationError::InvalidMinToFire(pipeline.min_to_fire));
        }

        if pipeline.recent_window == 0 {
            return Err(ConfigValidationError::InvalidRecentWindow);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("置信度阈值无效，必须在 [0, 1] 之间: {0}")]
    InvalidThreshold(f32),

    #[error("缓冲区容量无效，必须大于 0")]
    InvalidCapacity,

    #[error("最少触发数量无效: {0}")]
    InvalidMinToFire(usize),

    #[error("新颖性窗口无效，必须大于 0")]
    InvalidRecentWindow,

    #[error("未知的文本生成后端: {0}")]
    UnknownBackend(String),

    #[error("文本生成服务地址未配置")]
    MissingGeneratorUrl,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}
