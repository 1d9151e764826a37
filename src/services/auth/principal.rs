use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded claims of a verified bearer credential.
///
/// Claims are kept as raw JSON: the role field and the part of the principal
/// stored on failure records are both addressed by JSON pointer from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(Value);

impl Principal {
    pub fn new(claims: Value) -> Self {
        Self(claims)
    }

    pub fn claims(&self) -> &Value {
        &self.0
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// Value at `pointer` ("" is the whole principal).
    pub fn at(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    /// Role set found at `pointer`.
    ///
    /// Only an array counts: its string elements are the roles. A bare
    /// string, any other value, or a missing field yields no roles.
    pub fn roles_at(&self, pointer: &str) -> Vec<String> {
        match self.0.pointer(pointer) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}
