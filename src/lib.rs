//! # syncro-session
//!
//! Client-side session state for the Syncro front-end: holds the bearer token
//! and user profile, persists them across reloads, attaches the token to
//! outgoing API requests, and exposes login/register/logout plus role checks.
//!
//! Wiring, in order of construction:
//!
//! 1. [`state::channel`] creates the session channel.
//! 2. [`net::ApiClient`] takes the read half, so every request it builds
//!    carries the current token.
//! 3. [`state::SessionProvider`] takes the write half, a
//!    [`storage::KeyValueStore`], and an [`net::AuthApi`].
//! 4. Consumers get [`state::SessionHandle`]s from the provider.

pub mod config;
pub mod net;
pub mod state;
pub mod storage;

pub use config::SessionConfig;
pub use net::{ApiClient, ApiError, AuthApi, HttpAuthApi};
pub use state::{AuthFailure, Session, SessionHandle, SessionPhase, SessionProvider, SessionUser};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
