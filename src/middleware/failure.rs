//! Failure recording middleware (dead letters).
//!
//! Responsibility:
//! - Buffer the request body so it can be snapshotted after the handler ran
//! - Record body read failures (413 over the limit, 400 otherwise)
//! - Turn handler panics into an unhandled error response
//! - Hand every error response to the `FailureRecorder`
//! - Return the original response unchanged
//!
//! Errors are observed through the `RaisedError` that `AppError` attaches to
//! its response. Error responses without one (extractor rejections, etc.) are
//! observed with only their status known.

use std::any::Any;
use std::error::Error as StdError;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, RawPathParams, State, rejection::RawPathParamsRejection},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::{AppError, RaisedError};
use crate::middleware::RequestContext;
use crate::services::dead_letter::RequestSnapshot;
use crate::state::AppState;

/// Record failures of every route registered on `router` so far.
///
/// Apply after the access guard so rejected requests are observed too.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router
        .route_layer(CatchPanicLayer::custom(catch_panic))
        .route_layer(middleware::from_fn_with_state(state, record_failures))
}

async fn record_failures(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    params: Result<RawPathParams, RawPathParamsRejection>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let params: Vec<(String, String)> = params
        .map(|p| {
            p.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let body = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let error = body_read_error(err);
            tracing::warn!(error = %error, "failed to buffer request body");

            // Nothing of the body survives; the guard has not run either.
            let raised = error.to_raised();
            let snapshot =
                RequestSnapshot::capture(&parts.method, &original_uri, &parts.headers, params, &[]);
            state.recorder.observe(&raised, &snapshot, None).await;
            return error.into_response();
        }
    };

    let method = parts.method.clone();
    let headers = parts.headers.clone();

    let ctx = RequestContext::new();
    parts.extensions.insert(ctx.clone());

    let response = next
        .run(Request::from_parts(parts, Body::from(body.clone())))
        .await;

    let status = response.status();
    let raised = match response.extensions().get::<RaisedError>() {
        Some(raised) => Some(raised.clone()),
        None if status.is_client_error() || status.is_server_error() => {
            Some(RaisedError::from_status(status))
        }
        None => None,
    };

    if let Some(raised) = raised {
        let snapshot = RequestSnapshot::capture(&method, &original_uri, &headers, params, &body);
        state
            .recorder
            .observe(&raised, &snapshot, ctx.principal())
            .await;
    }

    response
}

// Over the body limit: 413. Any other read failure (client disconnect,
// broken stream): 400.
fn body_read_error(err: axum::Error) -> AppError {
    let inner = err.into_inner();
    if exceeds_length_limit(&*inner) {
        return AppError::PayloadTooLarge;
    }
    AppError::bad_request(
        "BODY_READ_FAILED",
        format!("failed to read request body: {inner}"),
    )
}

fn exceeds_length_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %message, "handler panicked");

    AppError::unhandled(format!("panic: {message}")).into_response()
}
