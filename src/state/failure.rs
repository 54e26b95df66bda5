//! Failure value returned by login and register.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is reported as data for the UI to display. The payload is
//! chosen in order: the server's response body, then the error's own message,
//! then a generic per-operation fallback.

#[cfg(test)]
#[path = "failure_test.rs"]
mod failure_test;

use std::fmt;

use serde_json::Value;

use crate::net::types::ApiError;
use crate::storage::StorageError;

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// What went wrong, in the most specific form available.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    /// Body returned by the server with a non-success status.
    Server(Value),
    /// Transport error text, a description of a parse or storage error,
    /// or the generic fallback.
    Message(String),
}

/// A login or register attempt that did not produce a session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthFailure {
    /// HTTP status when the server rejected the request.
    pub status: Option<u16>,
    pub error: ErrorPayload,
}

impl AuthFailure {
    /// Convert an API error, falling back to `fallback` when the error
    /// carries nothing to show.
    pub(crate) fn from_api(err: &ApiError, fallback: &str) -> Self {
        if let ApiError::Rejected { status, body: Some(body) } = err {
            if !is_blank(body) {
                return Self { status: Some(*status), error: ErrorPayload::Server(body.clone()) };
            }
        }
        let detail = match err {
            ApiError::Request(message) => message.clone(),
            other => other.to_string(),
        };
        Self { status: err.status(), error: message_or(detail, fallback) }
    }

    /// Convert a storage failure hit while persisting a fresh session.
    pub(crate) fn from_storage(err: &StorageError, fallback: &str) -> Self {
        Self { status: None, error: message_or(err.to_string(), fallback) }
    }

    /// Human-readable text for display.
    ///
    /// Server payloads that are JSON objects are searched for a `message`,
    /// `error`, `title` or `detail` string; other payloads are rendered as JSON.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.error {
            ErrorPayload::Message(m) => m.clone(),
            ErrorPayload::Server(Value::String(s)) => s.clone(),
            ErrorPayload::Server(body) => ["message", "error", "title", "detail"]
                .iter()
                .find_map(|k| body.get(k).and_then(Value::as_str))
                .map_or_else(|| body.to_string(), str::to_owned),
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for AuthFailure {}

fn message_or(message: String, fallback: &str) -> ErrorPayload {
    if message.trim().is_empty() {
        ErrorPayload::Message(fallback.to_owned())
    } else {
        ErrorPayload::Message(message)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
