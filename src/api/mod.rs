//! API 模块
//!
//! 提供 REST API 支持：语法纠错服务挂在根路径，会话接口挂在 `/api/v1`。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::config::config::CorsConfig;
use crate::observability::metrics_middleware;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn create_router(app_state: AppState, cors: &CorsConfig) -> Router {
    let api = Router::new().merge(routes::session_routes::create_session_router());

    Router::new()
        .merge(routes::grammar_routes::create_grammar_router())
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            app_state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(app_state)
}

/// 只允许配置中的来源跨域访问
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
