//! Namespacing wrapper routing one bin's keys to its backend.

use std::sync::Arc;

use crate::storage::{KeyList, KeyString, KeyValue, Pattern, Storage};
use crate::utils::TribError;

use async_trait::async_trait;

/// Separator between a bin name and a key inside the backend key space.
pub const BIN_SEPARATOR: &str = "::";

/// One bin: a view of a backend where every key lives under `name::`.
pub struct Bin {
    /// Name of the bin.
    name: String,

    /// Key prefix on the backend, i.e. `name::`.
    prefix: String,

    /// Backend the bin is routed to.
    store: Arc<dyn Storage>,
}

impl Bin {
    /// Creates a bin named `name` on top of backend `store`.
    pub fn new(name: impl Into<String>, store: Arc<dyn Storage>) -> Self {
        let name = name.into();
        let prefix = format!("{}{}", name, BIN_SEPARATOR);
        Bin {
            name,
            prefix,
            store,
        }
    }

    /// Name of the bin.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn wrap_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn wrap_kv(&self, kv: &KeyValue) -> KeyValue {
        KeyValue::new(self.wrap_key(&kv.key), kv.value.as_str())
    }

    fn wrap_pattern(&self, p: &Pattern) -> Pattern {
        Pattern::new(self.wrap_key(&p.prefix), p.suffix.as_str())
    }

    /// Strips this bin's prefix off backend keys. Keys without the prefix
    /// do not belong to the bin and are dropped.
    fn unwrap_keys(&self, keys: Vec<String>) -> Vec<String> {
        keys.into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(String::from))
            .collect()
    }
}

#[async_trait]
impl KeyString for Bin {
    async fn get(&self, key: &str) -> Result<Option<String>, TribError> {
        self.store.get(&self.wrap_key(key)).await
    }

    async fn set(&self, kv: &KeyValue) -> Result<bool, TribError> {
        self.store.set(&self.wrap_kv(kv)).await
    }

    async fn keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        let keys = self.store.keys(&self.wrap_pattern(p)).await?;
        Ok(self.unwrap_keys(keys))
    }
}

#[async_trait]
impl KeyList for Bin {
    async fn list_get(&self, key: &str) -> Result<Vec<String>, TribError> {
        self.store.list_get(&self.wrap_key(key)).await
    }

    async fn list_append(&self, kv: &KeyValue) -> Result<bool, TribError> {
        self.store.list_append(&self.wrap_kv(kv)).await
    }

    async fn list_remove(&self, kv: &KeyValue) -> Result<u32, TribError> {
        self.store.list_remove(&self.wrap_kv(kv)).await
    }

    async fn list_keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        let keys = self.store.list_keys(&self.wrap_pattern(p)).await?;
        Ok(self.unwrap_keys(keys))
    }
}

#[async_trait]
impl Storage for Bin {
    async fn clock(&self, at_least: u64) -> Result<u64, TribError> {
        self.store.clock(at_least).await
    }
}
