//! Storage node interface implemented by every backend, by the RPC client
//! stub and by bin wrappers.

mod memory;

pub use memory::MemStorage;

use crate::utils::TribError;

use async_trait::async_trait;

use serde::{Deserialize, Serialize};

/// A key-value pair, used both for single-value keys and list elements.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Key pattern: a key matches if it starts with `prefix` and ends with
/// `suffix`.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub prefix: String,
    pub suffix: String,
}

impl Pattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Pattern {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Returns true if `key` matches this pattern.
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix) && key.ends_with(&self.suffix)
    }
}

/// Single-value key operations.
#[async_trait]
pub trait KeyString: Send + Sync {
    /// Gets the value of `key`, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, TribError>;

    /// Sets `kv.key` to `kv.value`, overwriting any previous value. Returns
    /// whether the write was acknowledged.
    async fn set(&self, kv: &KeyValue) -> Result<bool, TribError>;

    /// Lists all single-value keys matching pattern `p`.
    async fn keys(&self, p: &Pattern) -> Result<Vec<String>, TribError>;
}

/// List key operations.
#[async_trait]
pub trait KeyList: Send + Sync {
    /// Gets the list under `key`; an absent list is empty.
    async fn list_get(&self, key: &str) -> Result<Vec<String>, TribError>;

    /// Appends `kv.value` to the end of list `kv.key`.
    async fn list_append(&self, kv: &KeyValue) -> Result<bool, TribError>;

    /// Removes all elements equal to `kv.value` from list `kv.key`, returning
    /// the number of elements removed.
    async fn list_remove(&self, kv: &KeyValue) -> Result<u32, TribError>;

    /// Lists all non-empty list keys matching pattern `p`.
    async fn list_keys(&self, p: &Pattern) -> Result<Vec<String>, TribError>;
}

/// The full storage node interface, including the logical clock.
#[async_trait]
pub trait Storage: KeyString + KeyList {
    /// Advances the logical clock to at least `at_least` and returns a value
    /// `>= at_least`. Each value is strictly greater than every value returned
    /// before, until the clock reaches `u64::MAX`; from then on every call
    /// returns `u64::MAX`.
    async fn clock(&self, at_least: u64) -> Result<u64, TribError>;
}
