/*
 * Responsibility
 * - GET /health (疎通用、guard なし)
 * - dead-letter sink の backend 名も返す
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "dead_letter_sink": state.recorder.sink_backend(),
        })),
    )
}
