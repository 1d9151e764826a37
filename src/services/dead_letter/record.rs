use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method, Uri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::RaisedError;

/// What the failure recorder keeps of the inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl RequestSnapshot {
    pub fn capture(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        params: impl IntoIterator<Item = (String, String)>,
        body: &[u8],
    ) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: uri.to_string(),
            headers: header_map(headers),
            params: params.into_iter().collect(),
            query: query_map(uri.query()),
            body: body_value(body),
        }
    }
}

// Repeated headers are joined with ", ". Non UTF-8 values are stored lossily.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

// Last value wins for repeated keys.
fn query_map(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// JSON bodies are kept as JSON, anything else as a (lossy) string, empty as null.
pub fn body_value(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub message: String,
    pub stack: Option<String>,
    // Serialized form of the raised error
    pub raw: String,
}

/// Dead-letter entry for one unexpected request failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    pub body: Value,
    pub headers: BTreeMap<String, String>,
    pub method: String,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,

    pub error: ErrorDescription,
    pub user: Option<Value>,
    pub status: u16,
}

impl FailureRecord {
    pub fn build(error: &RaisedError, request: &RequestSnapshot, user: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            body: request.body.clone(),
            headers: request.headers.clone(),
            method: request.method.clone(),
            url: request.url.clone(),
            params: request.params.clone(),
            query: request.query.clone(),
            error: ErrorDescription {
                message: error.message.clone(),
                stack: error.stack.clone(),
                raw: error.raw.to_string(),
            },
            user,
            status: error.derived_status(),
        }
    }
}
