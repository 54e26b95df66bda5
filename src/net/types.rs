//! Wire types for the authentication endpoints.
//!
//! Request types borrow their fields; they are built per call and serialized
//! straight into the request body.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login/register response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by calls to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("API request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("API rejected request: status {status}")]
    Rejected {
        status: u16,
        /// Response payload: parsed JSON when possible, raw text otherwise,
        /// `None` when the body was empty.
        body: Option<serde_json::Value>,
    },

    /// A success response did not match the expected shape.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// HTTP status for rejections, `None` for every other variant.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
