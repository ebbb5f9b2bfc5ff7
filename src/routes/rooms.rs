//! Room diagnostics over HTTP.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services;
use crate::state::AppState;

/// `GET /api/rooms/{room}`: participant and history counts.
pub async fn room_info(State(state): State<AppState>, Path(room): Path<String>) -> Response {
    match services::room::room_summary(&state, &room).await {
        Some(summary) => Json(summary).into_response(),
        None => (StatusCode::NOT_FOUND, "room not found").into_response(),
    }
}
