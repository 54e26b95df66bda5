//! Client-side session state.
//!
//! DESIGN
//! ======
//! `session` is the value and its channel, `record` the persisted form,
//! `provider` the only code that writes either, and `failure` the error value
//! login/register hand back to the UI.

pub mod failure;
pub mod provider;
pub mod record;
pub mod session;

pub use failure::{AuthFailure, ErrorPayload};
pub use provider::SessionProvider;
pub use session::{Session, SessionClosed, SessionHandle, SessionPhase, SessionPublisher, SessionUser, channel};
