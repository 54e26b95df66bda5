//! Shared HTTP client with a construction-time authorization interceptor.
//!
//! DESIGN
//! ======
//! There is no mutable default-header table. Each `ApiClient` holds a
//! [`SessionHandle`] and reads the current token when a request is built, so
//! a login or logout anywhere in the process is reflected by the very next
//! request without any other component touching the client.
//!
//! The request timeout is applied per request because the browser build of
//! `reqwest` has no client-wide timeouts. The connect timeout exists only on
//! native targets.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};

use super::types::ApiError;
use crate::config::SessionConfig;
use crate::state::SessionHandle;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    request_timeout: Option<Duration>,
    session: SessionHandle,
}

impl ApiClient {
    /// Build a client with the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client fails to build.
    pub fn new(config: &SessionConfig, session: SessionHandle) -> Result<Self, ApiError> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        let http = builder
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        let mut client = Self::with_http(http, &config.api_base_url, session);
        client.request_timeout = Some(Duration::from_secs(config.timeouts.request_secs));
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client`. No per-request timeout is added.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: &str, session: SessionHandle) -> Self {
        Self { http, base_url: Arc::from(base_url.trim_end_matches('/')), request_timeout: None, session }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session view this client reads credentials from.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }

    /// Start a request, attaching `Authorization: Bearer <token>` when the
    /// session currently holds a token.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    format!("{base_url}/{}", path.trim_start_matches('/'))
}
