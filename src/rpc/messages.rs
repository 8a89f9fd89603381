//! Request/reply messages exchanged with backends and keepers.

use crate::storage::{KeyValue, Pattern};

use serde::{Deserialize, Serialize};

/// Request sent to a backend; one variant per storage operation.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum StorageRequest {
    Get { key: String },
    Set { kv: KeyValue },
    Keys { pattern: Pattern },
    ListGet { key: String },
    ListAppend { kv: KeyValue },
    ListRemove { kv: KeyValue },
    ListKeys { pattern: Pattern },
    Clock { at_least: u64 },
}

impl StorageRequest {
    /// Name of the remote method, used in logging.
    pub fn method(&self) -> &'static str {
        match self {
            StorageRequest::Get { .. } => "Storage.Get",
            StorageRequest::Set { .. } => "Storage.Set",
            StorageRequest::Keys { .. } => "Storage.Keys",
            StorageRequest::ListGet { .. } => "Storage.ListGet",
            StorageRequest::ListAppend { .. } => "Storage.ListAppend",
            StorageRequest::ListRemove { .. } => "Storage.ListRemove",
            StorageRequest::ListKeys { .. } => "Storage.ListKeys",
            StorageRequest::Clock { .. } => "Storage.Clock",
        }
    }
}

/// Successful result of a storage operation. List fields default to empty so
/// that a peer omitting them still decodes into an empty list.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum StorageResult {
    Get {
        value: Option<String>,
    },
    Set {
        succ: bool,
    },
    Keys {
        #[serde(default)]
        list: Vec<String>,
    },
    ListGet {
        #[serde(default)]
        list: Vec<String>,
    },
    ListAppend {
        succ: bool,
    },
    ListRemove {
        removed: u32,
    },
    ListKeys {
        #[serde(default)]
        list: Vec<String>,
    },
    Clock {
        ret: u64,
    },
}

/// Reply from a backend.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum StorageReply {
    /// The operation completed.
    Reply { result: StorageResult },

    /// The storage engine reported an error.
    Error { msg: String },
}

/// Request sent to a keeper.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum KeeperRequest {
    /// Query the backend address list.
    GetBacks,

    /// Query the keeper's ordinal.
    GetId,
}

/// Reply from a keeper.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum KeeperReply {
    GetBacks {
        #[serde(default)]
        backs: Vec<String>,
    },
    GetId {
        id: u64,
    },
    Error {
        msg: String,
    },
}
