//! Session client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5095";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_FILE: &str = ".syncro-session.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API base URL must not be empty")]
    EmptyBaseUrl,
    #[error("API base URL must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fixed origin every API path is joined onto, without trailing `/`.
    pub api_base_url: String,
    pub timeouts: Timeouts,
    /// Location of the persisted record for [`crate::storage::FileStore`].
    pub session_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeouts: Timeouts::default(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `SYNCRO_API_BASE_URL`: default `http://localhost:5095`
    /// - `SYNCRO_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SYNCRO_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SYNCRO_SESSION_FILE`: default `.syncro-session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if `SYNCRO_API_BASE_URL` is set but empty or not an
    /// http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = match std::env::var("SYNCRO_API_BASE_URL") {
            Ok(raw) => normalize_base_url(&raw)?,
            Err(_) => DEFAULT_API_BASE_URL.to_owned(),
        };
        let timeouts = Timeouts {
            request_secs: env_parse_u64("SYNCRO_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("SYNCRO_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file = std::env::var("SYNCRO_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        Ok(Self { api_base_url, timeouts, session_file })
    }

    /// Replace the base URL, applying the same validation as [`Self::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is empty or not an http(s) URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(raw)?;
        Ok(self)
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(trimmed.to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
