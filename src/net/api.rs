//! Authentication endpoints.
//!
//! `HttpAuthApi` is a thin wrapper over [`ApiClient`]; response handling is in
//! pure functions (`parse_auth_response`, `parse_error_body`) for testability.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde::Serialize;

use super::client::ApiClient;
use super::types::{ApiError, AuthResponse, LoginRequest, RegisterRequest};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Remote authentication API consumed by the session provider.
///
/// Futures are `Send` on native targets only; browser fetches are not.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and user.
    async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError>;

    /// Create an account and return its token and user.
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError>;
}

/// [`AuthApi`] over HTTP.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: ApiClient,
}

impl HttpAuthApi {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn post_auth<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthResponse, ApiError> {
        let response = self
            .client
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Rejected { status: status.as_u16(), body: parse_error_body(&text) });
        }

        parse_auth_response(&text)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.post_auth(LOGIN_PATH, request).await
    }

    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.post_auth(REGISTER_PATH, request).await
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_auth_response(text: &str) -> Result<AuthResponse, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

/// JSON when the body parses, raw text otherwise, `None` for an empty body.
fn parse_error_body(text: &str) -> Option<serde_json::Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_owned())))
}
