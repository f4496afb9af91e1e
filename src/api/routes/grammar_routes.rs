//! Grammar Routes
//!
//! 语法纠错服务的根路由，挂在 `/` 下而不是 `/api/v1`。

use crate::api::handlers::grammar_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

pub fn create_grammar_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/beautify", post(beautify))
        .route("/process-words", post(process_words))
}
