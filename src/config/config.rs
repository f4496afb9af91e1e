use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::trigger::CooldownPolicy;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            request_timeout: 30,
        }
    }
}

/// 识别流水线配置
///
/// 两种触发变体（识别后清空缓冲区 / 保留缓冲区）、最少触发数量与去重步骤
/// 在不同前端实现之间并不一致，因此全部做成可配置项。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 置信度阈值（严格大于才记录）
    pub confidence_threshold: f32,
    /// 检测缓冲区容量 K
    pub buffer_capacity: usize,
    /// 触发造句所需的最少缓冲标签数
    pub min_to_fire: usize,
    /// 新颖性检查窗口 N（最近 N 个标签）
    pub recent_window: usize,
    /// 冷却时间（毫秒）
    pub cooldown_ms: u64,
    /// 冷却策略
    pub cooldown_policy: CooldownPolicy,
    /// 造句成功后清空检测缓冲区
    pub clear_after_fire: bool,
    /// 映射前对标签去重
    pub dedup_before_mapping: bool,
    /// 对话记录容量 M
    pub conversation_capacity: usize,
    /// 采样间隔（毫秒）
    pub sampling_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            buffer_capacity: 15,
            min_to_fire: 3,
            recent_window: 3,
            cooldown_ms: 3000,
            cooldown_policy: CooldownPolicy::Strict,
            clear_after_fire: true,
            dedup_before_mapping: true,
            conversation_capacity: 6,
            sampling_interval_ms: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }
}

/// 文本生成模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 后端类型: "none"、"ollama" 或 "grammar_service"
    pub backend: String,
    /// 服务地址
    pub base_url: String,
    /// 模型名称（ollama 使用）
    pub model_name: String,
    /// 单次请求超时（秒）
    pub request_timeout: u64,
    /// 初始化等待超时（秒）
    pub init_timeout: u64,
    /// 最大生成长度
    pub max_length: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
            base_url: "http://localhost:11434".into(),
            model_name: "llama3.2".into(),
            request_timeout: 60,
            init_timeout: 10,
            max_length: 64,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
        }
    }
}

/// 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// 允许的前端来源
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".into()],
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 识别流水线配置
    pub pipeline: PipelineConfig,
    /// 文本生成模型配置
    pub generator: GeneratorConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 跨域配置
    pub cors: CorsConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            generator: GeneratorConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
            },
            cors: CorsConfig::default(),
            app_name: "medisign".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config
    }
}
