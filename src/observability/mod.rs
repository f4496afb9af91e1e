//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志和健康检查。

use axum::{Json, Router, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::config::LoggingConfig;

// ===== Simple Metrics =====

/// 简单应用指标
#[derive(Clone, Default)]
pub struct AppMetrics {
    pub http_requests_total: Arc<AtomicU64>,
    pub http_request_duration_sum: Arc<AtomicU64>,
    pub active_connections: Arc<AtomicI64>,
    pub sessions_active: Arc<AtomicI64>,
    pub detections_total: Arc<AtomicU64>,
    pub sentences_total: Arc<AtomicU64>,
    pub template_fallbacks_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 记录活跃连接
    pub fn record_connection(&self, delta: i64) {
        self.active_connections.fetch_add(delta, Ordering::SeqCst);
    }

    /// 记录会话变化
    pub fn record_session(&self, delta: i64) {
        self.sessions_active.fetch_add(delta, Ordering::SeqCst);
    }

    /// 记录写入缓冲区的检测
    pub fn record_detection(&self) {
        self.detections_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录生成的句子
    pub fn record_sentence(&self, from_template: bool) {
        self.sentences_total.fetch_add(1, Ordering::SeqCst);
        if from_template {
            self.template_fallbacks_total.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP active_connections Active HTTP connections
# TYPE active_connections gauge
active_connections {}
# HELP sessions_active Active recognition sessions
# TYPE sessions_active gauge
sessions_active {}
# HELP detections_total Detections recorded into session buffers
# TYPE detections_total counter
detections_total {}
# HELP sentences_total Sentences appended to conversation logs
# TYPE sentences_total counter
sentences_total {}
# HELP template_fallbacks_total Sentences composed by the template fallback
# TYPE template_fallbacks_total counter
template_fallbacks_total {}
# HELP errors_total Total errors
# TYPE errors_total counter
errors_total {}
"#,
            self.http_requests_total.load(Ordering::SeqCst),
            self.http_request_duration_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.http_requests_total.load(Ordering::SeqCst),
            self.active_connections.load(Ordering::SeqCst),
            self.sessions_active.load(Ordering::SeqCst),
            self.detections_total.load(Ordering::SeqCst),
            self.sentences_total.load(Ordering::SeqCst),
            self.template_fallbacks_total.load(Ordering::SeqCst),
            self.errors_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

/// 健康检查结果
#[derive(Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
    pub latency_ms: u64,
}

/// 应用状态（用于健康检查）
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub health_checks: Arc<Mutex<Vec<HealthCheckResult>>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String) -> Self {
        Self::with_metrics(version, Arc::new(AppMetrics::default()))
    }

    /// 与 API 层共享同一份指标
    pub fn with_metrics(version: String, metrics: Arc<AppMetrics>) -> Self {
        Self {
            metrics,
            health_checks: Arc::new(Mutex::new(Vec::new())),
            start_time: Utc::now(),
            version,
        }
    }

    /// 添加健康检查结果，同名检查会被替换
    pub async fn add_health_check(&self, result: HealthCheckResult) {
        let mut checks = self.health_checks.lock().await;
        checks.retain(|c| c.name != result.name);
        checks.push(result);
        if checks.len() > 10 {
            checks.remove(0);
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(
    state: axum::extract::State<Arc<ObservabilityState>>,
) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: checks
            .iter()
            .map(|c| HealthCheck {
                name: c.name.clone(),
                status: if c.healthy {
                    "healthy".to_string()
                } else {
                    "unhealthy".to_string()
                },
                message: Some(c.message.clone()),
                latency_ms: Some(c.latency_ms),
            })
            .collect(),
    };

    // 生成模型不可用时仍可用模板造句，只报告降级
    (axum::http::StatusCode::OK, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查
pub async fn readiness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "Ready")
}

/// Prometheus 指标端点
pub async fn metrics(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let output = state.metrics.gather();
    (axum::http::StatusCode::OK, output)
}

/// 版本信息端点
pub async fn version(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的日志级别。
pub fn init_tracing(service_name: &str, config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}={}", config.level, service_name, config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    let result = if config.structured {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    axum::extract::State(metrics): axum::extract::State<Arc<AppMetrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let start = std::time::Instant::now();

    metrics.record_connection(1);

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    metrics.record_http_request(duration_ms);
    metrics.record_connection(-1);
    if response.status().is_server_error() {
        metrics.record_error();
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = AppMetrics::default();
        metrics.record_http_request(100);
        metrics.record_connection(1);
        metrics.record_detection();
        metrics.record_sentence(true);
        metrics.record_sentence(false);
        metrics.record_error();

        let output = metrics.gather();
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("active_connections 1"));
        assert!(output.contains("detections_total 1"));
        assert!(output.contains("sentences_total 2"));
        assert!(output.contains("template_fallbacks_total 1"));
        assert!(output.contains("errors_total 1"));
    }

    #[test]
    fn test_session_gauge_goes_down() {
        let metrics = AppMetrics::default();
        metrics.record_session(1);
        metrics.record_session(1);
        metrics.record_session(-1);
        assert!(metrics.gather().contains("sessions_active 1"));
    }

    #[tokio::test]
    async fn test_health_check_replaced_by_name() {
        let state = ObservabilityState::new("0.1.0".to_string());
        for healthy in [false, true] {
            state
                .add_health_check(HealthCheckResult {
                    name: "text_generator".to_string(),
                    healthy,
                    message: "probe".to_string(),
                    latency_ms: 3,
                })
                .await;
        }

        let checks = state.health_checks.lock().await;
        assert_eq!(checks.len(), 1);
        assert!(checks[0].healthy);
    }
}
