/*
 * Responsibility
 * - GET /me : 検証済み Principal の claims をそのまま返す
 */
use axum::Json;
use serde_json::Value;

use crate::api::v1::extractors::PrincipalExtractor;

pub async fn me(PrincipalExtractor(principal): PrincipalExtractor) -> Json<Value> {
    Json(principal.claims().clone())
}
