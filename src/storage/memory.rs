//! In-memory storage engine served by backends.

use std::collections::HashMap;

use crate::storage::{KeyList, KeyString, KeyValue, Pattern, Storage};
use crate::utils::TribError;

use async_trait::async_trait;

use tokio::sync::Mutex;

/// Volatile state of one storage node.
#[derive(Debug, Default)]
struct State {
    /// Single-value keys. Setting an empty value removes the key.
    strs: HashMap<String, String>,

    /// List keys. Lists that become empty are removed.
    lists: HashMap<String, Vec<String>>,

    /// Next value to hand out from the logical clock.
    clock: u64,
}

/// The local volatile storage engine, which is simply a pair of in-memory
/// HashMaps plus a logical clock, all behind one lock so that every
/// operation is serialized.
#[derive(Debug, Default)]
pub struct MemStorage {
    state: Mutex<State>,
}

impl MemStorage {
    /// Creates a new empty storage engine with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Collects keys of `map` matching `p`, sorted.
fn matching_keys<V>(map: &HashMap<String, V>, p: &Pattern) -> Vec<String> {
    let mut keys: Vec<String> =
        map.keys().filter(|k| p.matches(k)).cloned().collect();
    keys.sort();
    keys
}

#[async_trait]
impl KeyString for MemStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, TribError> {
        let state = self.state.lock().await;
        Ok(state.strs.get(key).cloned())
    }

    async fn set(&self, kv: &KeyValue) -> Result<bool, TribError> {
        let mut state = self.state.lock().await;
        if kv.value.is_empty() {
            state.strs.remove(&kv.key);
        } else {
            state.strs.insert(kv.key.clone(), kv.value.clone());
        }
        pf_trace!("set {:?}", kv);
        Ok(true)
    }

    async fn keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        let state = self.state.lock().await;
        Ok(matching_keys(&state.strs, p))
    }
}

#[async_trait]
impl KeyList for MemStorage {
    async fn list_get(&self, key: &str) -> Result<Vec<String>, TribError> {
        let state = self.state.lock().await;
        Ok(state.lists.get(key).cloned().unwrap_or_default())
    }

    async fn list_append(&self, kv: &KeyValue) -> Result<bool, TribError> {
        let mut state = self.state.lock().await;
        state
            .lists
            .entry(kv.key.clone())
            .or_default()
            .push(kv.value.clone());
        pf_trace!("list_append {:?}", kv);
        Ok(true)
    }

    async fn list_remove(&self, kv: &KeyValue) -> Result<u32, TribError> {
        let mut state = self.state.lock().await;
        let Some(list) = state.lists.get_mut(&kv.key) else {
            return Ok(0);
        };

        let before = list.len();
        list.retain(|v| v != &kv.value);
        let removed = before - list.len();
        if list.is_empty() {
            state.lists.remove(&kv.key);
        }
        pf_trace!("list_remove {:?} removed {}", kv, removed);
        Ok(u32::try_from(removed).unwrap_or(u32::MAX))
    }

    async fn list_keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        let state = self.state.lock().await;
        Ok(matching_keys(&state.lists, p))
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn clock(&self, at_least: u64) -> Result<u64, TribError> {
        let mut state = self.state.lock().await;
        if at_least > state.clock {
            state.clock = at_least;
        }
        let ret = state.clock;
        state.clock = state.clock.saturating_add(1);
        Ok(ret)
    }
}
