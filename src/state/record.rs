//! Persisted token/user pair.
//!
//! The record lives under two keys, `token` (raw string) and `user` (JSON
//! `{username, role}`), so it stays readable by any other code that shares the
//! same storage.

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;

use super::session::SessionUser;
use crate::storage::{KeyValueStore, StorageError};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Result of reading the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredRecord {
    /// Both keys present and the user value parsed.
    Complete { token: String, user: SessionUser },
    /// At least one key is missing, or the user value is JSON `null`.
    Absent,
    /// Both keys present but the user value is not valid JSON for a user.
    Corrupt,
}

/// Read the record. Empty strings count as missing.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn load(store: &dyn KeyValueStore) -> Result<StoredRecord, StorageError> {
    let token = store.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
    let user = store.get(USER_KEY)?.filter(|u| !u.is_empty());
    let (Some(token), Some(raw_user)) = (token, user) else {
        return Ok(StoredRecord::Absent);
    };
    match serde_json::from_str::<Option<SessionUser>>(&raw_user) {
        Ok(Some(user)) => Ok(StoredRecord::Complete { token, user }),
        Ok(None) => Ok(StoredRecord::Absent),
        Err(_) => Ok(StoredRecord::Corrupt),
    }
}

/// Write both keys. If either write fails, both keys are put back to what
/// they held before the call.
///
/// # Errors
///
/// Returns an error if encoding the user, reading the old values, or either
/// write fails.
pub fn save(store: &dyn KeyValueStore, token: &str, user: &SessionUser) -> Result<(), StorageError> {
    let raw_user = serde_json::to_string(user)?;
    let old_token = store.get(TOKEN_KEY)?;
    let old_user = store.get(USER_KEY)?;

    let written = store.set(TOKEN_KEY, token).and_then(|()| store.set(USER_KEY, &raw_user));
    if let Err(e) = written {
        restore(store, TOKEN_KEY, old_token.as_deref());
        restore(store, USER_KEY, old_user.as_deref());
        return Err(e);
    }
    Ok(())
}

fn restore(store: &dyn KeyValueStore, key: &str, previous: Option<&str>) {
    let result = match previous {
        Some(value) => store.set(key, value),
        None => store.remove(key),
    };
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "failed to roll back persisted session");
    }
}

/// Remove both keys. Both removals are attempted; the first error wins.
///
/// # Errors
///
/// Returns an error if either removal fails.
pub fn clear(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    let token = store.remove(TOKEN_KEY);
    let user = store.remove(USER_KEY);
    token.and(user)
}
