/*
 * Responsibility
 * - アプリ共通の AppError 定義 (kind discriminant + status code)
 * - IntoResponse 実装 (HTTP status / JSON error body) = default error responder
 * - 応答に RaisedError を載せて、failure recorder が観測できるようにする
 */
use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repos::error::RepoError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Discriminant of [`AppError`], also stored on the failure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    InvalidCredential,
    Forbidden,
    BadRequest,
    NotFound,
    PayloadTooLarge,
    Unhandled,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {detail}")]
    InvalidCredential { detail: String },
    // Role mismatch. The status is configurable (401 unless configured otherwise).
    #[error("forbidden")]
    Forbidden { status: StatusCode },
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("{message}")]
    Unhandled {
        status: Option<StatusCode>,
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled {
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Unhandled error with an explicit status, e.g. an upstream 502.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Unhandled {
            status: Some(status),
            message: message.into(),
            source: None,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Unhandled {
            status: None,
            message: "internal server error".to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingCredential => ErrorKind::MissingCredential,
            AppError::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            AppError::Forbidden { .. } => ErrorKind::Forbidden,
            AppError::BadRequest { .. } => ErrorKind::BadRequest,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::PayloadTooLarge => ErrorKind::PayloadTooLarge,
            AppError::Unhandled { .. } => ErrorKind::Unhandled,
        }
    }

    /// Status carried by the error itself, if any.
    ///
    /// `Unhandled` errors without an explicit status return `None`; the
    /// responder and the failure recorder both fall back to 500 for those.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            AppError::MissingCredential | AppError::InvalidCredential { .. } => {
                Some(StatusCode::UNAUTHORIZED)
            }
            AppError::Forbidden { status } => Some(*status),
            AppError::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            AppError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            AppError::PayloadTooLarge => Some(StatusCode::PAYLOAD_TOO_LARGE),
            AppError::Unhandled { status, .. } => *status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Forbidden { status } if *status == StatusCode::FORBIDDEN => "FORBIDDEN",
            AppError::MissingCredential
            | AppError::InvalidCredential { .. }
            | AppError::Forbidden { .. } => "UNAUTHORIZED",
            AppError::BadRequest { code, .. } => *code,
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            AppError::Unhandled { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    // Client-facing message. Credential details stay in logs / dead letters.
    fn public_message(&self) -> String {
        match self {
            AppError::Forbidden { status } if *status == StatusCode::FORBIDDEN => {
                "forbidden".into()
            }
            AppError::MissingCredential
            | AppError::InvalidCredential { .. }
            | AppError::Forbidden { .. } => "unauthorized".into(),
            AppError::BadRequest { message, .. } => message.clone(),
            AppError::NotFound { resource } => format!("{resource} not found."),
            AppError::PayloadTooLarge => "payload too large".into(),
            AppError::Unhandled { status, message, .. } => match status {
                Some(s) if s.is_client_error() => message.clone(),
                _ => "internal server error".into(),
            },
        }
    }

    /// Snapshot of this error for observers further up the middleware stack.
    pub fn to_raised(&self) -> RaisedError {
        RaisedError {
            kind: Some(self.kind()),
            status_code: self.status_code().map(|s| s.as_u16()),
            status: None,
            message: self.to_string(),
            stack: Some(source_chain(self)),
            raw: serde_json::json!({
                "kind": self.kind(),
                "statusCode": self.status_code().map(|s| s.as_u16()),
                "message": self.to_string(),
                "debug": format!("{self:?}"),
            }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let raised = self.to_raised();

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.public_message(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(raised);
        response
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::internal(e)
    }
}

/// An error that escaped a handler or middleware, as seen by observers.
///
/// `status_code` and `status` mirror the two places a status may live on a
/// raised error; [`RaisedError::derived_status`] prefers the former.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaisedError {
    pub kind: Option<ErrorKind>,
    pub status_code: Option<u16>,
    pub status: Option<u16>,
    pub message: String,
    pub stack: Option<String>,
    pub raw: serde_json::Value,
}

impl RaisedError {
    pub fn derived_status(&self) -> u16 {
        self.status_code.or(self.status).unwrap_or(500)
    }

    /// Error response produced outside of [`AppError`] (extractor rejections,
    /// fallback 404s, timeouts). Only the response status is known.
    pub fn from_status(status: StatusCode) -> Self {
        let message = status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();

        Self {
            kind: None,
            status_code: None,
            status: Some(status.as_u16()),
            raw: serde_json::json!({ "status": status.as_u16(), "message": message }),
            message,
            stack: None,
        }
    }
}

fn source_chain(err: &dyn StdError) -> String {
    let mut out = format!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    out
}
