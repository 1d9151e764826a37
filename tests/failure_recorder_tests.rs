mod common;

use std::sync::Arc;
use std::time::Duration;

use access_guard::config::DispatchMode;
use access_guard::services::dead_letter::{FailureRecord, FailureRecorder};
use access_guard::state::AppState;
use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;

use common::*;

#[tokio::test]
async fn not_found_is_not_recorded() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let response = send(app, get_with_token("/missing", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn bad_request_is_not_recorded_by_default() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let response = send(app, get_with_token("/invalid", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn bad_request_is_recorded_when_not_whitelisted() {
    let sink = Arc::new(MemorySink::default());
    let recorder = inline_recorder(sink.clone()).with_whitelist(whitelist(&[401, 403, 404]));
    let app = app(state(controller(), recorder));

    let response = send(app, get_with_token("/invalid", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 400);
}

#[tokio::test]
async fn unhandled_error_is_recorded_once_with_request_snapshot() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));
    let token = token_with_roles(json!(["user"]));

    let request = Request::builder()
        .method("POST")
        .uri("/items/42?force=true")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .header("x-trace", "abc-123")
        .body(Body::from(r#"{"name":"widget","qty":3}"#))
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let records = sink.records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.status, 500);
    assert_eq!(record.method, "POST");
    assert_eq!(record.url, "/items/42?force=true");
    assert_eq!(record.params["item_id"], "42");
    assert_eq!(record.query["force"], "true");
    assert_eq!(record.body, json!({ "name": "widget", "qty": 3 }));
    assert_eq!(record.headers["x-trace"], "abc-123");
    assert_eq!(record.headers["authorization"], format!("Bearer {token}"));
    assert_eq!(record.error.message, "database unreachable");
    assert_eq!(record.user.as_ref().unwrap()["sub"], "u-42");
}

#[tokio::test]
async fn response_reaches_client_unchanged() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));
    let token = token_with_roles(json!(["user"]));

    let request = Request::builder()
        .method("POST")
        .uri("/items/7")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "error": { "code": "INTERNAL_SERVER_ERROR", "message": "internal server error" } })
    );
}

#[tokio::test]
async fn sink_failure_does_not_reach_client() {
    let sink = Arc::new(MemorySink::failing());
    let app = app(default_state(sink.clone()));

    let response = send(app, get_with_token("/upstream", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn explicit_status_is_recorded() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let response = send(app, get_with_token("/upstream", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 502);
    assert_eq!(records[0].user, None);
}

#[tokio::test]
async fn panic_is_recorded_as_500() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let response = send(app, get_with_token("/panic", None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 500);
    assert!(records[0].error.message.contains("index out of range"));
}

#[tokio::test]
async fn framework_rejection_is_recorded_with_its_status() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header("content-type", "text/plain")
        .body(Body::from("not json"))
        .unwrap();

    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 415);
    assert_eq!(records[0].body, json!("not json"));
    assert_eq!(records[0].error.stack, None);
}

#[tokio::test]
async fn successful_request_is_not_recorded() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"ok":true}"#))
        .unwrap();

    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn nested_principal_path() {
    let sink = Arc::new(MemorySink::default());
    let recorder = inline_recorder(sink.clone()).with_principal_path("/user");
    let app = app(state(controller(), recorder));
    let token = token_with_roles(json!(["user"]));

    let request = Request::builder()
        .method("POST")
        .uri("/items/1")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await;

    let records = sink.records();
    assert_eq!(records[0].user, Some(json!({ "id": 42, "type": ["user"] })));
}

#[tokio::test]
async fn background_dispatch_eventually_stores() {
    let sink = Arc::new(MemorySink::default());
    let recorder = FailureRecorder::new(sink.clone()).with_dispatch(DispatchMode::Background);
    let app = app(state(controller(), recorder));

    let response = send(app, get_with_token("/upstream", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    tokio::time::timeout(Duration::from_secs(2), sink.written.notified())
        .await
        .expect("dead letter was not written");
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn stored_record_round_trips() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    send(app, get_with_token("/upstream?region=eu", None)).await;

    let record = sink.records().remove(0);
    let stored = serde_json::to_value(&record).unwrap();
    let loaded: FailureRecord = serde_json::from_value(stored).unwrap();

    assert_eq!(loaded.status, 502);
    assert_eq!(loaded.url, "/upstream?region=eu");
    assert_eq!(loaded.method, "GET");
}

fn broken_upload() -> Body {
    let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok(r#"{"name":"#),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )),
    ];
    Body::from_stream(futures_util::stream::iter(chunks))
}

#[tokio::test]
async fn interrupted_body_is_a_bad_request_and_recorded() {
    let sink = Arc::new(MemorySink::default());
    let recorder = inline_recorder(sink.clone()).with_whitelist(whitelist(&[401, 403, 404]));
    let app = app(state(controller(), recorder));

    let request = Request::builder()
        .method("POST")
        .uri("/echo?draft=1")
        .header("content-type", "application/json")
        .body(broken_upload())
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BODY_READ_FAILED");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 400);
    assert_eq!(records[0].url, "/echo?draft=1");
    assert_eq!(records[0].query["draft"], "1");
    assert_eq!(records[0].body, serde_json::Value::Null);
    assert_eq!(records[0].user, None);
}

#[tokio::test]
async fn interrupted_body_is_not_recorded_by_default() {
    let sink = Arc::new(MemorySink::default());
    let app = app(default_state(sink.clone()));

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .body(broken_upload())
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn oversized_body_is_recorded_as_413() {
    let sink = Arc::new(MemorySink::default());
    let state = AppState::new(
        Arc::new(controller()),
        Arc::new(inline_recorder(sink.clone())),
        8,
    );
    let app = app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"name":"far too long for the limit"}"#))
        .unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, 413);
    assert_eq!(records[0].body, serde_json::Value::Null);
}
