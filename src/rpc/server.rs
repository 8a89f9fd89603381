//! Backend RPC server: exposes a local storage engine to remote clients.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::rpc::{StorageReply, StorageRequest, StorageResult};
use crate::storage::Storage;
use crate::utils::{read_frame, write_frame, TribError};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

/// Backend configuration.
pub struct BackConfig {
    /// Address to listen on, in `host:port` form.
    pub addr: String,

    /// The storage engine to expose.
    pub store: Arc<dyn Storage>,

    /// If set, receives `true` once the listener is bound, or `false` if
    /// binding failed.
    pub ready: Option<mpsc::Sender<bool>>,

    /// If set, the server stops accepting connections once `true` is sent.
    pub shutdown: Option<watch::Receiver<bool>>,
}

/// Reports startup outcome on an optional ready channel.
pub(crate) async fn notify_ready(ready: &Option<mpsc::Sender<bool>>, ok: bool) {
    if let Some(tx_ready) = ready {
        if let Err(e) = tx_ready.send(ok).await {
            pf_warn!("error sending to ready channel: {}", e);
        }
    }
}

/// Resolves once `true` is observed on an optional shutdown channel. Never
/// resolves if there is no channel or its sender is gone.
pub(crate) async fn wait_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx_term) = shutdown {
        while !*rx_term.borrow_and_update() {
            if rx_term.changed().await.is_err() {
                break;
            }
        }
        if *rx_term.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Serves `bc.store` on `bc.addr`. Blocks accepting connections until the
/// shutdown signal arrives (if any), and only returns early on binding
/// errors.
pub async fn serve_back(bc: BackConfig) -> Result<(), TribError> {
    let BackConfig {
        addr,
        store,
        ready,
        mut shutdown,
    } = bc;

    let listener = match TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            pf_error!("error binding backend on '{}': {}", addr, e);
            notify_ready(&ready, false).await;
            return Err(e.into());
        }
    };
    pf_info!("serving storage on '{}'", addr);
    notify_ready(&ready, true).await;

    loop {
        tokio::select! {
            // new client connection
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(back_servant_task(
                            store.clone(),
                            stream,
                            peer,
                        ));
                    }
                    Err(e) => {
                        pf_warn!("error accepting connection: {}", e);
                    }
                }
            },

            // termination signal
            _ = wait_shutdown(&mut shutdown) => {
                pf_info!("backend on '{}' shutting down", addr);
                break;
            }
        }
    }

    Ok(())
}

/// Executes one request against the storage engine.
pub(crate) async fn execute(
    store: &dyn Storage,
    req: StorageRequest,
) -> Result<StorageResult, TribError> {
    let result = match req {
        StorageRequest::Get { key } => StorageResult::Get {
            value: store.get(&key).await?,
        },
        StorageRequest::Set { kv } => StorageResult::Set {
            succ: store.set(&kv).await?,
        },
        StorageRequest::Keys { pattern } => StorageResult::Keys {
            list: store.keys(&pattern).await?,
        },
        StorageRequest::ListGet { key } => StorageResult::ListGet {
            list: store.list_get(&key).await?,
        },
        StorageRequest::ListAppend { kv } => StorageResult::ListAppend {
            succ: store.list_append(&kv).await?,
        },
        StorageRequest::ListRemove { kv } => StorageResult::ListRemove {
            removed: store.list_remove(&kv).await?,
        },
        StorageRequest::ListKeys { pattern } => StorageResult::ListKeys {
            list: store.list_keys(&pattern).await?,
        },
        StorageRequest::Clock { at_least } => StorageResult::Clock {
            ret: store.clock(at_least).await?,
        },
    };
    Ok(result)
}

/// Per-connection servant task: serves requests until the peer closes.
async fn back_servant_task(
    store: Arc<dyn Storage>,
    mut conn: TcpStream,
    peer: SocketAddr,
) {
    pf_trace!("servant for {} spawned", peer);

    loop {
        let req: StorageRequest = match read_frame(&mut conn).await {
            Ok(Some(req)) => req,
            Ok(None) => break, // peer done
            Err(e) => {
                pf_error!("error reading request from {}: {}", peer, e);
                break;
            }
        };

        let method = req.method();
        let reply = match execute(store.as_ref(), req).await {
            Ok(result) => StorageReply::Reply { result },
            Err(e) => {
                pf_warn!("{} from {} failed: {}", method, peer, e);
                StorageReply::Error { msg: e.to_string() }
            }
        };

        if let Err(e) = write_frame(&reply, &mut conn).await {
            pf_error!("error replying to {}: {}", peer, e);
            break;
        }
    }

    pf_trace!("servant for {} exited", peer);
}
