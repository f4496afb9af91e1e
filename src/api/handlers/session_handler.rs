use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::session_dto::*},
    error::AppError,
    services::symptom_mapper::SymptomMapper,
};

pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.create();
    let snapshot = session.snapshot();

    let response = CreateSessionResponse {
        id: snapshot.info.id,
        created_at: snapshot.info.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sessions = state.sessions.ids();
    let response = SessionListResponse {
        total: sessions.len(),
        sessions,
    };
    Ok(Json(response))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting session: {}", id);

    let session = state.sessions.get(&id)?;
    Ok(Json(SessionResponse::from(session.snapshot())))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Deleting session: {}", id);

    state.sessions.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_predictions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PredictionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Session {} received {} prediction(s)",
        id,
        request.predictions.len()
    );

    let session = state.sessions.get(&id)?;
    let outcome = session.observe_predictions(request.predictions).await;
    let buffer = session.snapshot().buffer;

    Ok(Json(TickResponse::new(outcome, buffer)))
}

pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(&id)?;
    session.clear();
    Ok(Json(SessionResponse::from(session.snapshot())))
}

pub async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(&id)?;
    session.stop();
    Ok(Json(SessionResponse::from(session.snapshot())))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(&id)?;
    session.start();
    Ok(Json(SessionResponse::from(session.snapshot())))
}

pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".into()));
    }

    let session = state.sessions.get(&id)?;
    let entry = session.add_counterpart_message(text);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// 列出分类器可识别的症状手势
pub async fn list_gestures() -> impl IntoResponse {
    let mapper = SymptomMapper::new();
    let gestures: Vec<GestureResponse> = mapper
        .known_labels()
        .into_iter()
        .map(|label| GestureResponse {
            phrase: mapper.map_label(label.as_str()),
            label,
        })
        .collect();
    Json(gestures)
}
