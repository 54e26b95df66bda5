//! Synchronous key-value persistence for the session record.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session provider reads and writes the persisted token/user pair through
//! [`KeyValueStore`]. In the browser this is `window.localStorage`
//! ([`BrowserStore`], `hydrate` feature); native builds use a JSON file
//! ([`FileStore`]) and tests use [`MemoryStore`].
//!
//! All operations are synchronous, matching local storage semantics: a write
//! is visible to the next read without awaiting anything.

mod file;
mod memory;

#[cfg(feature = "hydrate")]
mod browser;

#[cfg(feature = "hydrate")]
pub use browser::BrowserStore;
pub use file::FileStore;
pub use memory::MemoryStore;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be reached (no window, storage disabled).
    #[error("storage unavailable")]
    Unavailable,

    /// Reading or writing the backing file failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded or decoded.
    #[error("storage encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backend rejected the operation (quota exceeded, security error).
    #[error("storage backend error: {0}")]
    Backend(String),
}

// =============================================================================
// TRAIT
// =============================================================================

/// String key-value store with local storage semantics.
pub trait KeyValueStore: Send + Sync {
    /// Return the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
