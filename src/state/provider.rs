//! Session provider: the single writer of session state.
//!
//! DESIGN
//! ======
//! The provider couples three collaborators passed in at construction: a
//! [`KeyValueStore`] for the persisted record, an [`AuthApi`] for the remote
//! calls, and the [`SessionPublisher`] half of the session channel. Consumers
//! never see the provider's internals; they get a [`SessionHandle`] from
//! [`SessionProvider::subscribe`].
//!
//! Login and register persist first and publish second. A failed write rolls
//! storage back to the previous record and leaves the in-memory session
//! untouched.
//!
//! TRADE-OFFS
//! ==========
//! A persisted token is adopted at startup without asking the server whether
//! it is still valid. A stale record looks authenticated until the first API
//! call that the server rejects.

#[cfg(test)]
#[path = "provider_test.rs"]
mod provider_test;

use super::failure::{AuthFailure, LOGIN_FAILED, REGISTRATION_FAILED};
use super::record::{self, StoredRecord};
use super::session::{Session, SessionHandle, SessionPhase, SessionPublisher, SessionUser};
use crate::net::api::AuthApi;
use crate::net::types::{ApiError, AuthResponse, LoginRequest, RegisterRequest};
use crate::storage::KeyValueStore;

pub struct SessionProvider<S, A> {
    store: S,
    api: A,
    publisher: SessionPublisher,
}

impl<S, A> SessionProvider<S, A>
where
    S: KeyValueStore,
    A: AuthApi,
{
    #[must_use]
    pub fn new(publisher: SessionPublisher, store: S, api: A) -> Self {
        Self { store, api, publisher }
    }

    /// Adopt the persisted record, if any. Always ends with `loading == false`.
    ///
    /// No network call is made; the stored token is trusted as-is.
    pub fn initialize(&self) {
        self.publisher.publish(Session::initializing());

        let session = match record::load(&self.store) {
            Ok(StoredRecord::Complete { token, user }) => {
                tracing::debug!(username = %user.username, role = %user.role, "restored persisted session");
                Session::authenticated(token, user)
            }
            Ok(StoredRecord::Absent) => {
                tracing::debug!("no persisted session");
                Session::anonymous()
            }
            Ok(StoredRecord::Corrupt) => {
                tracing::warn!("persisted user record unreadable; clearing");
                if let Err(e) = record::clear(&self.store) {
                    tracing::warn!(error = %e, "failed to clear persisted session");
                }
                Session::anonymous()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                Session::anonymous()
            }
        };

        self.publisher.publish(session);
    }

    /// Sign in with `username` and `password`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthFailure`] when the request, the response, or
    /// persisting the new session fails. The current session is unchanged.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, AuthFailure> {
        tracing::info!(%username, "login attempt");
        let result = self.api.login(&LoginRequest { username, password }).await;
        self.adopt(result, LOGIN_FAILED)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::login`].
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<SessionUser, AuthFailure> {
        tracing::info!(%username, %email, "registration attempt");
        let result = self.api.register(&RegisterRequest { username, email, password }).await;
        self.adopt(result, REGISTRATION_FAILED)
    }

    /// Forget the session locally. Storage errors are logged; the in-memory
    /// session is cleared regardless.
    pub fn logout(&self) {
        if let Err(e) = record::clear(&self.store) {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.publisher.publish(Session::anonymous());
        tracing::info!("logged out");
    }

    fn adopt(&self, result: Result<AuthResponse, ApiError>, fallback: &str) -> Result<SessionUser, AuthFailure> {
        let response = result.map_err(|e| {
            tracing::warn!(status = ?e.status(), error = %e, "{fallback}");
            AuthFailure::from_api(&e, fallback)
        })?;

        let AuthResponse { token, username, role } = response;
        let user = SessionUser { username, role };
        record::save(&self.store, &token, &user).map_err(|e| {
            tracing::warn!(error = %e, "failed to persist session");
            AuthFailure::from_storage(&e, fallback)
        })?;

        tracing::info!(username = %user.username, role = %user.role, "session established");
        self.publisher
            .publish(Session::authenticated(token, user.clone()));
        Ok(user)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// A new read-only view of the session.
    #[must_use]
    pub fn subscribe(&self) -> SessionHandle {
        self.publisher.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.publisher.current()
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.snapshot().user().cloned()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.snapshot().token().map(str::to_owned)
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.snapshot().is_loading()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.snapshot().phase()
    }

    #[must_use]
    pub fn has_role(&self, required_role: &str) -> bool {
        self.snapshot().has_role(required_role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }
}
