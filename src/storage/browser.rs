//! `window.localStorage` backend for hydrated (WASM) builds.

use super::{KeyValueStore, StorageError};

/// Store backed by the page's `localStorage`.
///
/// The handle is resolved on every call; `web_sys::Storage` is not `Send`, so
/// it cannot be cached in a type shared across tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStore;

impl BrowserStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn local_storage() -> Result<web_sys::Storage, StorageError> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or(StorageError::Unavailable)
}

fn backend_error(err: &wasm_bindgen::JsValue) -> StorageError {
    StorageError::Backend(format!("{err:?}"))
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage()?
            .get_item(key)
            .map_err(|e| backend_error(&e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage()?
            .set_item(key, value)
            .map_err(|e| backend_error(&e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        local_storage()?
            .remove_item(key)
            .map_err(|e| backend_error(&e))
    }
}
