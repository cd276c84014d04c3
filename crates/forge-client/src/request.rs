//! Request and response descriptors.

use reqwest::Method;
use serde_json::Value;

use crate::error::{Error, Result};

/// Fields the backend uses for top-level error messages, in priority order.
const MESSAGE_FIELDS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

/// Longest raw body echoed back as an error message.
const MAX_MESSAGE_LEN: usize = 200;

/// One outbound API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a request without query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A raw response: status plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub text: String,
}

impl ApiResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The backend rejected the bearer token itself.
    pub fn is_auth_rejection(&self) -> bool {
        self.status == 401
    }

    /// Parse the body as JSON. An empty body is `null`.
    pub fn json(&self) -> Result<Value> {
        if self.text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.text).map_err(|e| Error::InvalidResponse {
            status: self.status,
            message: format!("body is not valid JSON: {}", e),
        })
    }

    /// Convert a non-success response into [`Error::Api`].
    pub fn into_error(self) -> Error {
        let body = match serde_json::from_str::<Value>(&self.text) {
            Ok(value) => value,
            Err(_) if self.text.trim().is_empty() => Value::Null,
            Err(_) => Value::String(self.text),
        };

        let mut message = extract_error_message(&body);
        if message.is_empty() {
            message = format!("HTTP {}", self.status);
        }

        Error::Api {
            status: self.status,
            message,
            body,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Known message fields win. Otherwise the body is treated as per-field
/// validation errors and rendered as `Field Name: error; error`. Anything
/// else falls back to its text, truncated.
pub fn extract_error_message(body: &Value) -> String {
    if let Value::Object(map) = body {
        for field in MESSAGE_FIELDS {
            if let Some(value) = map.get(field) {
                return join_messages(value);
            }
        }

        let field_errors: Vec<String> = map
            .iter()
            .map(|(field, errors)| format!("{}: {}", title_case(field), join_messages(errors)))
            .collect();

        if !field_errors.is_empty() {
            return field_errors.join("; ");
        }
    }

    truncate(&value_text(body))
}

fn join_messages(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join("; "),
        other => value_text(other),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn title_case(field: &str) -> String {
    field
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_MESSAGE_LEN {
        let head: String = text.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
