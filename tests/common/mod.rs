#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use access_guard::api::v1::extractors::PrincipalExtractor;
use access_guard::config::DispatchMode;
use access_guard::error::AppError;
use access_guard::middleware;
use access_guard::services::auth::{AccessController, JwtVerifier, RoleRequirements};
use access_guard::services::dead_letter::{
    DeadLetterSink, FailureRecord, FailureRecorder, SinkError, StatusWhitelist,
};
use access_guard::state::AppState;
use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::Path,
    http::{Request, Response},
    routing::{get, post},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, get_current_timestamp};
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

/// Sink that keeps records in memory.
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<FailureRecord>>,
    pub fail: bool,
    pub written: Notify,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterSink for MemorySink {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, record: FailureRecord) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Unavailable("dead letter store offline".into()));
        }
        self.records.lock().unwrap().push(record);
        self.written.notify_one();
        Ok(())
    }
}

pub fn token(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn token_with_roles(roles: Value) -> String {
    token(json!({
        "sub": "u-42",
        "exp": get_current_timestamp() + 600,
        "user": { "id": 42, "type": roles },
    }))
}

pub fn controller() -> AccessController {
    let verifier = JwtVerifier::new(SECRET, Algorithm::HS256, None, None, 0);
    AccessController::new(Arc::new(verifier)).with_requirements(
        RoleRequirements::new()
            .require("/admin", ["admin"])
            .require("/staff", ["admin", "user"]),
    )
}

pub fn inline_recorder(sink: Arc<MemorySink>) -> FailureRecorder {
    FailureRecorder::new(sink).with_dispatch(DispatchMode::Inline)
}

pub fn state(controller: AccessController, recorder: FailureRecorder) -> AppState {
    AppState::new(Arc::new(controller), Arc::new(recorder), 64 * 1024)
}

pub fn default_state(sink: Arc<MemorySink>) -> AppState {
    state(controller(), inline_recorder(sink))
}

pub fn whitelist(statuses: &[u16]) -> StatusWhitelist {
    StatusWhitelist::new(statuses.iter().copied())
}

async fn whoami(PrincipalExtractor(principal): PrincipalExtractor) -> Json<Value> {
    Json(principal.claims().clone())
}

async fn open() -> Json<Value> {
    Json(json!({ "status": "open" }))
}

async fn save_item(Path(_item_id): Path<String>) -> Result<Json<Value>, AppError> {
    Err(AppError::unhandled("database unreachable"))
}

async fn missing() -> Result<Json<Value>, AppError> {
    Err(AppError::not_found("item"))
}

async fn invalid() -> Result<Json<Value>, AppError> {
    Err(AppError::bad_request("INVALID_ITEM", "item name is required"))
}

async fn upstream() -> Result<Json<Value>, AppError> {
    Err(AppError::with_status(
        axum::http::StatusCode::BAD_GATEWAY,
        "pricing service returned 503",
    ))
}

async fn explode() -> Json<Value> {
    panic!("index out of range")
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

/// Router with the same layering as the service: access guard on protected
/// routes, failure recorder around everything.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(whoami))
        .route("/admin", get(whoami))
        .route("/staff", get(whoami))
        .route("/items/{item_id}", post(save_item));
    let protected = middleware::auth::access::apply(protected, state.clone());

    let router = Router::new()
        .route("/open", get(open))
        .route("/missing", get(missing))
        .route("/invalid", get(invalid))
        .route("/upstream", get(upstream))
        .route("/panic", get(explode))
        .route("/echo", post(echo))
        .merge(protected);

    middleware::failure::apply(router, state.clone()).with_state(state)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
