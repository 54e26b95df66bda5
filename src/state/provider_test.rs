use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use super::*;
use crate::state::failure::ErrorPayload;
use crate::state::record::{TOKEN_KEY, USER_KEY};
use crate::state::session::channel;
use crate::storage::{MemoryStore, StorageError};

// =============================================================================
// STUBS
// =============================================================================

#[derive(Clone)]
enum Reply {
    Ok { token: &'static str, username: &'static str, role: &'static str },
    Reject { status: u16, body: Option<serde_json::Value> },
    Down(&'static str),
}

impl Reply {
    fn to_result(&self) -> Result<AuthResponse, ApiError> {
        match self {
            Self::Ok { token, username, role } => Ok(AuthResponse {
                token: (*token).to_owned(),
                username: (*username).to_owned(),
                role: (*role).to_owned(),
            }),
            Self::Reject { status, body } => Err(ApiError::Rejected { status: *status, body: body.clone() }),
            Self::Down(message) => Err(ApiError::Request((*message).to_owned())),
        }
    }
}

struct StubApi {
    reply: Mutex<Reply>,
    calls: AtomicUsize,
    last_email: Mutex<Option<String>>,
}

impl StubApi {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply: Mutex::new(reply), calls: AtomicUsize::new(0), last_email: Mutex::new(None) })
    }

    fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthApi for Arc<StubApi> {
    async fn login(&self, _request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().to_result()
    }

    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_email.lock().unwrap() = Some(request.email.to_owned());
        self.reply.lock().unwrap().to_result()
    }
}

/// Store whose writes always fail, like a full quota.
struct FullStore(MemoryStore);

impl KeyValueStore for FullStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("quota exceeded".to_owned()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.0.remove(key)
    }
}

/// Shares a memory store but refuses writes to one key, or every removal.
struct FaultyStore {
    inner: Arc<MemoryStore>,
    fail_set: Option<&'static str>,
    fail_remove: bool,
}

impl KeyValueStore for FaultyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_set == Some(key) {
            return Err(StorageError::Backend("quota exceeded".to_owned()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_remove {
            return Err(StorageError::Backend("locked".to_owned()));
        }
        self.inner.remove(key)
    }
}

const BOB_USER: Reply = Reply::Ok { token: "t1", username: "bob", role: "user" };

fn provider_with(
    store: Arc<MemoryStore>,
    reply: Reply,
) -> (SessionProvider<Arc<MemoryStore>, Arc<StubApi>>, Arc<StubApi>) {
    let (publisher, _handle) = channel();
    let api = StubApi::new(reply);
    (SessionProvider::new(publisher, store, api.clone()), api)
}

fn persisted_bob_admin() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        (TOKEN_KEY, "abc"),
        (USER_KEY, r#"{"username":"bob","role":"admin"}"#),
    ]))
}

// =============================================================================
// initialize
// =============================================================================

#[test]
fn loading_until_initialized() {
    let (provider, _api) = provider_with(Arc::new(MemoryStore::new()), BOB_USER);
    assert!(provider.loading());
    assert_eq!(provider.phase(), SessionPhase::Uninitialized);

    provider.initialize();
    assert!(!provider.loading());
    assert_eq!(provider.phase(), SessionPhase::Anonymous);
}

#[test]
fn initialize_adopts_persisted_record_without_network() {
    let (provider, api) = provider_with(persisted_bob_admin(), BOB_USER);
    provider.initialize();

    assert!(provider.is_authenticated());
    assert!(provider.has_role("admin"));
    assert_eq!(provider.token().as_deref(), Some("abc"));
    assert_eq!(provider.user(), Some(SessionUser::new("bob", "admin")));
    assert_eq!(api.calls(), 0);
}

#[test]
fn initialize_with_token_only_is_anonymous() {
    let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "abc")]));
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();

    assert!(!provider.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
}

#[test]
fn initialize_clears_corrupt_record() {
    let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USER_KEY, "{oops")]));
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();

    assert!(!provider.is_authenticated());
    assert!(!provider.loading());
    assert!(store.is_empty());
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_success_persists_and_adopts_session() {
    let store = Arc::new(MemoryStore::new());
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();

    let user = provider.login("bob", "secret").await.unwrap();
    assert_eq!(user, SessionUser::new("bob", "user"));

    assert!(provider.is_authenticated());
    assert!(provider.has_role("user"));
    assert!(!provider.has_role("admin"));
    assert_eq!(provider.token().as_deref(), Some("t1"));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    let raw: serde_json::Value = serde_json::from_str(&store.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw, json!({ "username": "bob", "role": "user" }));
}

#[tokio::test]
async fn login_failure_leaves_prior_session_unchanged() {
    let store = persisted_bob_admin();
    let (provider, api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();
    let before = provider.snapshot();

    api.set_reply(Reply::Reject { status: 401, body: Some(json!({ "message": "Invalid credentials" })) });
    let failure = provider.login("bob", "wrong").await.unwrap_err();

    assert_eq!(failure.status, Some(401));
    assert_eq!(failure.message(), "Invalid credentials");
    assert_eq!(provider.snapshot(), before);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
}

#[tokio::test]
async fn login_transport_failure_reports_message() {
    let store = Arc::new(MemoryStore::new());
    let (provider, _api) = provider_with(store.clone(), Reply::Down("connection refused"));
    provider.initialize();

    let failure = provider.login("bob", "secret").await.unwrap_err();
    assert_eq!(failure.status, None);
    assert_eq!(failure.error, ErrorPayload::Message("connection refused".to_owned()));
    assert!(!provider.is_authenticated());
    assert!(store.is_empty());
}

#[tokio::test]
async fn login_persist_failure_leaves_session_unchanged() {
    let (publisher, handle) = channel();
    let provider = SessionProvider::new(publisher, FullStore(MemoryStore::new()), StubApi::new(BOB_USER));
    provider.initialize();

    let failure = provider.login("bob", "secret").await.unwrap_err();
    assert_eq!(failure.message(), "storage backend error: quota exceeded");
    assert!(!handle.is_authenticated());
    assert!(handle.token().is_none());
}

#[tokio::test]
async fn login_user_write_failure_keeps_previous_record() {
    let inner = persisted_bob_admin();
    let store = FaultyStore { inner: inner.clone(), fail_set: Some(USER_KEY), fail_remove: false };
    let (publisher, _handle) = channel();
    let provider = SessionProvider::new(
        publisher,
        store,
        StubApi::new(Reply::Ok { token: "t_other", username: "mallory", role: "user" }),
    );
    provider.initialize();
    let before = provider.snapshot();

    provider.login("mallory", "pw").await.unwrap_err();
    assert_eq!(provider.snapshot(), before);
    assert_eq!(inner.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

    // A restart over the same storage restores the earlier session intact.
    let (provider, _api) = provider_with(inner, BOB_USER);
    provider.initialize();
    assert_eq!(provider.token().as_deref(), Some("abc"));
    assert_eq!(provider.user(), Some(SessionUser::new("bob", "admin")));
}

#[tokio::test]
async fn login_notifies_subscribers() {
    let (provider, _api) = provider_with(Arc::new(MemoryStore::new()), BOB_USER);
    provider.initialize();
    let mut handle = provider.subscribe();

    provider.login("bob", "secret").await.unwrap();
    let session = handle.changed().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Authenticated);
    assert_eq!(session.token(), Some("t1"));
}

// =============================================================================
// register
// =============================================================================

#[tokio::test]
async fn register_success_adopts_session() {
    let (provider, api) =
        provider_with(Arc::new(MemoryStore::new()), Reply::Ok { token: "t9", username: "carol", role: "admin" });
    provider.initialize();

    let user = provider.register("carol", "carol@example.test", "pw").await.unwrap();
    assert_eq!(user, SessionUser::new("carol", "admin"));
    assert!(provider.has_role("admin"));
    assert_eq!(api.last_email.lock().unwrap().as_deref(), Some("carol@example.test"));
}

#[tokio::test]
async fn register_blank_error_falls_back_to_generic_message() {
    let (provider, _api) = provider_with(Arc::new(MemoryStore::new()), Reply::Down(""));
    provider.initialize();

    let failure = provider.register("carol", "carol@example.test", "pw").await.unwrap_err();
    assert_eq!(failure.message(), "Registration failed");
    assert!(!provider.is_authenticated());
}

#[tokio::test]
async fn register_conflict_carries_server_text() {
    let (provider, _api) = provider_with(
        Arc::new(MemoryStore::new()),
        Reply::Reject { status: 409, body: Some(json!("Username already exists")) },
    );
    provider.initialize();

    let failure = provider.register("bob", "bob@example.test", "pw").await.unwrap_err();
    assert_eq!(failure.status, Some(409));
    assert_eq!(failure.error, ErrorPayload::Server(json!("Username already exists")));
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_clears_memory_and_storage() {
    let store = Arc::new(MemoryStore::new());
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();
    provider.login("bob", "secret").await.unwrap();

    provider.logout();
    assert!(!provider.is_authenticated());
    assert!(!provider.has_role("user"));
    assert!(provider.user().is_none());
    assert!(provider.token().is_none());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(USER_KEY).unwrap(), None);
    assert_eq!(provider.phase(), SessionPhase::Anonymous);
}

#[test]
fn logout_after_restore_clears_session() {
    let store = persisted_bob_admin();
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();
    assert!(provider.is_authenticated());

    provider.logout();
    assert!(!provider.is_authenticated());
    assert!(store.is_empty());
}

#[test]
fn logout_storage_failure_still_clears_session() {
    let inner = persisted_bob_admin();
    let store = FaultyStore { inner: inner.clone(), fail_set: None, fail_remove: true };
    let (publisher, handle) = channel();
    let provider = SessionProvider::new(publisher, store, StubApi::new(BOB_USER));
    provider.initialize();
    assert!(handle.is_authenticated());

    provider.logout();
    assert!(!provider.is_authenticated());
    assert!(handle.token().is_none());
    assert!(handle.user().is_none());
    assert_eq!(inner.len(), 2);
}

#[test]
fn initialize_with_null_user_is_anonymous_and_keeps_storage() {
    let store = Arc::new(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USER_KEY, "null")]));
    let (provider, _api) = provider_with(store.clone(), BOB_USER);
    provider.initialize();

    assert!(!provider.is_authenticated());
    assert!(provider.token().is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn has_role_false_without_user() {
    let (provider, _api) = provider_with(Arc::new(MemoryStore::new()), BOB_USER);
    provider.initialize();
    assert!(!provider.has_role("user"));
    assert!(!provider.has_role(""));
}
