//! Durable key-value storage behind the credential store.
//!
//! The browser build persists into `localStorage` so credentials survive page
//! reloads; native builds (and tests) use an in-memory map. Absence of a key
//! is a normal state everywhere, never an error.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::errors::RequestError;

/// String-slot storage used by the session store.
pub trait KeyValueStorage: Send + Sync {
    /// Read a slot. `None` covers both "never written" and "unreadable".
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), RequestError>;

    /// Remove a slot. Removing an absent slot is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory storage for native hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), RequestError> {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                Ok(())
            }
            Err(_) => Err(RequestError::StorageError {
                message: "storage mutex poisoned".to_string(),
            }),
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// `localStorage`-backed storage for the browser build.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserStorage {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::get::<String>(key).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), RequestError> {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::set(key, value.to_string()).map_err(|e| {
            RequestError::StorageError {
                message: format!("failed to write localStorage slot {}: {:?}", key, e),
            }
        })
    }

    fn remove(&self, key: &str) {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::delete(key);
    }
}
