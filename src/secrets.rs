//! Secret-store collaborator contract
//!
//! Holds the cloud resolver's API key. Values must never appear in logs
//! or error messages.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Key-value store for credentials
pub trait SecretStore: Send + Sync {
    /// Fetch a secret; `None` when absent or blank
    fn get_secret(&self, name: &str) -> Option<String>;

    fn put_secret(&self, name: &str, value: &str);
}

/// In-memory store for tests and the demo binary
#[derive(Default)]
pub struct MemorySecretStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self, name: &str) -> Option<String> {
        self.values
            .read()
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    fn put_secret(&self, name: &str, value: &str) {
        self.values.write().insert(name.to_string(), value.to_string());
    }
}
