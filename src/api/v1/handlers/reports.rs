/*
 * Responsibility
 * - POST /reports (role: admin or user)
 * - 受け取った JSON に submitted_by を付けて返す
 * - object 以外の body は 400
 */
use axum::{Json, http::StatusCode};
use serde_json::Value;

use crate::api::v1::extractors::PrincipalExtractor;
use crate::error::AppError;

pub async fn submit_report(
    PrincipalExtractor(principal): PrincipalExtractor,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Value::Object(mut report) = body else {
        return Err(AppError::bad_request(
            "INVALID_REPORT",
            "report body must be a JSON object",
        ));
    };

    if let Some(sub) = principal.subject() {
        report.insert("submitted_by".into(), Value::String(sub.to_string()));
    }

    Ok((StatusCode::CREATED, Json(Value::Object(report))))
}
