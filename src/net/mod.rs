//! Networking for the remote authentication API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` is the shared HTTP client every request goes through, `api`
//! defines the auth endpoints on top of it, and `types` holds the wire schema
//! and [`ApiError`].

pub mod api;
pub mod client;
pub mod types;

pub use api::{AuthApi, HttpAuthApi};
pub use client::ApiClient;
pub use types::ApiError;
