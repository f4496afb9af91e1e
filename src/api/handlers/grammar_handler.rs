use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::grammar_dto::*},
    error::AppError,
    generation::grammar_service::TASK_PREFIX,
    services::medical_phrasing::distinct_words,
};

pub const ROOT_MESSAGE: &str = "Sign Language Grammar Corrector API is running";

pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

pub async fn beautify(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 兼容自带任务前缀的客户端
    let text = request
        .text
        .strip_prefix(TASK_PREFIX)
        .unwrap_or(&request.text)
        .trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }

    debug!("Beautifying {} chars", text.len());
    let beautified = state.phrasing.correct_grammar(text).await?;

    Ok(Json(BeautifyResponse {
        input: request.text,
        beautified,
    }))
}

pub async fn process_words(
    State(state): State<AppState>,
    Json(request): Json<StructuredRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Processing words: count={}, context={}, timestamp={}",
        request.words.len(),
        request.context,
        request.timestamp
    );

    let beautified = state
        .phrasing
        .process_words(&request.words, &request.context)
        .await?;
    let unique_words = distinct_words(&request.words);

    Ok(Json(ProcessWordsResponse {
        word_count: request.words.len(),
        unique_words,
        input_words: request.words,
        context: request.context,
        beautified,
    }))
}
