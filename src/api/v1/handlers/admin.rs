/*
 * Responsibility
 * - GET /admin/stats (role: admin)
 */
use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::v1::extractors::PrincipalExtractor;
use crate::state::AppState;

pub async fn admin_stats(
    State(state): State<AppState>,
    PrincipalExtractor(principal): PrincipalExtractor,
) -> Json<Value> {
    Json(json!({
        "requested_by": principal.subject(),
        "dead_letter_sink": state.recorder.sink_backend(),
        "dead_letter_dispatch": format!("{:?}", state.recorder.dispatch()).to_lowercase(),
    }))
}
