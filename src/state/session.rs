//! Session value and the channel that distributes it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider owns the only [`SessionPublisher`]. Everything else (UI
//! components, request handlers, the HTTP interceptor) holds a cheap clone of
//! [`SessionHandle`] and either reads the current session or awaits the next
//! change.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Identity of the signed-in user as persisted under the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub role: String,
}

impl SessionUser {
    #[must_use]
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self { username: username.into(), role: role.into() }
    }
}

/// Coarse lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// `initialize` has not run yet.
    Uninitialized,
    /// `initialize` is reading the persisted record.
    Loading,
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Uninitialized,
    Loading,
    Ready,
}

/// Current token, user and loading flag.
///
/// Constructors keep `user` present only alongside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<SessionUser>,
    load: LoadState,
}

impl Default for Session {
    fn default() -> Self {
        Self { token: None, user: None, load: LoadState::Uninitialized }
    }
}

impl Session {
    /// A ready session holding `token` and `user`.
    #[must_use]
    pub fn authenticated(token: impl Into<String>, user: SessionUser) -> Self {
        Self { token: Some(token.into()), user: Some(user), load: LoadState::Ready }
    }

    /// A ready session with no identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { token: None, user: None, load: LoadState::Ready }
    }

    pub(crate) fn initializing() -> Self {
        Self { token: None, user: None, load: LoadState::Loading }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// True until initialization has finished.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.load != LoadState::Ready
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    /// True iff a user is present and their role equals `required_role`.
    #[must_use]
    pub fn has_role(&self, required_role: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == required_role)
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.load {
            LoadState::Uninitialized => SessionPhase::Uninitialized,
            LoadState::Loading => SessionPhase::Loading,
            LoadState::Ready if self.is_authenticated() => SessionPhase::Authenticated,
            LoadState::Ready => SessionPhase::Anonymous,
        }
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Returned by [`SessionHandle::changed`] once the provider has been dropped.
#[derive(Debug, thiserror::Error)]
#[error("session provider dropped")]
pub struct SessionClosed;

/// Create a fresh uninitialized session channel.
#[must_use]
pub fn channel() -> (SessionPublisher, SessionHandle) {
    let (tx, rx) = watch::channel(Session::default());
    (SessionPublisher { tx }, SessionHandle { rx })
}

/// Write side of the session channel. Not `Clone`: there is one writer.
#[derive(Debug)]
pub struct SessionPublisher {
    tx: watch::Sender<Session>,
}

impl SessionPublisher {
    /// Replace the published session. Succeeds even with no live handles.
    pub fn publish(&self, session: Session) {
        self.tx.send_replace(session);
    }

    #[must_use]
    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionHandle {
        SessionHandle { rx: self.tx.subscribe() }
    }
}

/// Read side of the session channel.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    /// Clone of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.rx.borrow().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.rx.borrow().user.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.rx.borrow().phase()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    #[must_use]
    pub fn has_role(&self, required_role: &str) -> bool {
        self.rx.borrow().has_role(required_role)
    }

    /// Wait until the session changes after the last value this handle saw,
    /// then return the new session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] when the publisher has been dropped.
    pub async fn changed(&mut self) -> Result<Session, SessionClosed> {
        self.rx.changed().await.map_err(|_| SessionClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
