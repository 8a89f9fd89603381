//! Backend RPC client stub: one fresh connection per call.

use std::sync::Arc;

use crate::rpc::{StorageReply, StorageRequest, StorageResult};
use crate::storage::{KeyList, KeyString, KeyValue, Pattern, Storage};
use crate::utils::{read_frame, write_frame, TribError};

use async_trait::async_trait;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Creates a storage client talking to the backend at `addr`.
pub fn new_client(addr: &str) -> Arc<dyn Storage> {
    Arc::new(StorageClient::new(addr))
}

/// Storage interface stub that forwards every operation to a remote backend.
/// Errors from dialing, the transport or the remote engine are returned to
/// the caller as-is; nothing is retried.
#[derive(Debug, Clone)]
pub struct StorageClient {
    /// Backend address in `host:port` form.
    addr: String,
}

impl StorageClient {
    /// Creates a new client stub for backend `addr`. Does not connect.
    pub fn new(addr: impl Into<String>) -> Self {
        StorageClient { addr: addr.into() }
    }

    /// Backend address this stub talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one request and waits for its reply on an established
    /// connection.
    async fn round_trip(
        conn: &mut TcpStream,
        req: &StorageRequest,
    ) -> Result<StorageResult, TribError> {
        write_frame(req, conn).await?;
        match read_frame(conn).await? {
            Some(StorageReply::Reply { result }) => Ok(result),
            Some(StorageReply::Error { msg }) => Err(TribError::Msg(msg)),
            None => Err(TribError::msg(format!(
                "{} closed by {} before reply",
                req.method(),
                peer_hint(conn)
            ))),
        }
    }

    /// Performs a single remote call over a fresh connection. The connection
    /// is shut down even if the call fails; a shutdown error is reported only
    /// when the call itself succeeded.
    async fn call(
        &self,
        req: StorageRequest,
    ) -> Result<StorageResult, TribError> {
        let mut conn = TcpStream::connect(self.addr.as_str()).await?;

        let start = Instant::now();
        let result = Self::round_trip(&mut conn, &req).await;
        let closed = conn.shutdown().await;

        let result = result?;
        pf_debug!("{} latency = {:?}", req.method(), start.elapsed());
        closed?;
        Ok(result)
    }
}

/// Peer address of `conn` for error messages.
fn peer_hint(conn: &TcpStream) -> String {
    conn.peer_addr()
        .map_or_else(|_| "peer".into(), |addr| addr.to_string())
}

/// Error for a reply whose variant does not match the request.
fn mismatched(method: &str, result: StorageResult) -> TribError {
    TribError::msg(format!("{} got mismatched reply {:?}", method, result))
}

#[async_trait]
impl KeyString for StorageClient {
    async fn get(&self, key: &str) -> Result<Option<String>, TribError> {
        match self.call(StorageRequest::Get { key: key.into() }).await? {
            StorageResult::Get { value } => Ok(value),
            result => Err(mismatched("Storage.Get", result)),
        }
    }

    async fn set(&self, kv: &KeyValue) -> Result<bool, TribError> {
        match self.call(StorageRequest::Set { kv: kv.clone() }).await? {
            StorageResult::Set { succ } => Ok(succ),
            result => Err(mismatched("Storage.Set", result)),
        }
    }

    async fn keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        match self
            .call(StorageRequest::Keys { pattern: p.clone() })
            .await?
        {
            StorageResult::Keys { list } => Ok(list),
            result => Err(mismatched("Storage.Keys", result)),
        }
    }
}

#[async_trait]
impl KeyList for StorageClient {
    async fn list_get(&self, key: &str) -> Result<Vec<String>, TribError> {
        match self.call(StorageRequest::ListGet { key: key.into() }).await? {
            StorageResult::ListGet { list } => Ok(list),
            result => Err(mismatched("Storage.ListGet", result)),
        }
    }

    async fn list_append(&self, kv: &KeyValue) -> Result<bool, TribError> {
        match self
            .call(StorageRequest::ListAppend { kv: kv.clone() })
            .await?
        {
            StorageResult::ListAppend { succ } => Ok(succ),
            result => Err(mismatched("Storage.ListAppend", result)),
        }
    }

    async fn list_remove(&self, kv: &KeyValue) -> Result<u32, TribError> {
        match self
            .call(StorageRequest::ListRemove { kv: kv.clone() })
            .await?
        {
            StorageResult::ListRemove { removed } => Ok(removed),
            result => Err(mismatched("Storage.ListRemove", result)),
        }
    }

    async fn list_keys(&self, p: &Pattern) -> Result<Vec<String>, TribError> {
        match self
            .call(StorageRequest::ListKeys { pattern: p.clone() })
            .await?
        {
            StorageResult::ListKeys { list } => Ok(list),
            result => Err(mismatched("Storage.ListKeys", result)),
        }
    }
}

#[async_trait]
impl Storage for StorageClient {
    async fn clock(&self, at_least: u64) -> Result<u64, TribError> {
        match self.call(StorageRequest::Clock { at_least }).await? {
            StorageResult::Clock { ret } => Ok(ret),
            result => Err(mismatched("Storage.Clock", result)),
        }
    }
}
