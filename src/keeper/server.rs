//! Keeper: membership queries plus the clock synchronization loop.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::keeper::{ClockSync, KeeperConfig};
use crate::rpc::{
    notify_ready, wait_shutdown, KeeperReply, KeeperRequest, StorageClient,
};
use crate::storage::Storage;
use crate::utils::{read_frame, write_frame, TribError};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Membership facts served by a configured keeper.
#[derive(Debug)]
struct Membership {
    backs: Vec<String>,
    id: u64,
}

/// Keeper membership service. An unconfigured keeper answers every query
/// with a configuration error.
#[derive(Debug, Default, Clone)]
pub struct Keeper {
    membership: Option<Arc<Membership>>,
}

impl Keeper {
    /// Creates a keeper serving the membership described by `kc`.
    pub fn new(kc: &KeeperConfig) -> Self {
        Keeper {
            membership: Some(Arc::new(Membership {
                backs: kc.backs.clone(),
                id: kc.id,
            })),
        }
    }

    fn membership(&self) -> Result<&Membership, TribError> {
        self.membership
            .as_deref()
            .ok_or_else(|| TribError::Config("keeper not configured".into()))
    }

    /// Backend addresses known to this keeper.
    pub fn get_backs(&self) -> Result<Vec<String>, TribError> {
        Ok(self.membership()?.backs.clone())
    }

    /// This keeper's ordinal.
    pub fn get_id(&self) -> Result<u64, TribError> {
        Ok(self.membership()?.id)
    }

    /// Answers one membership request.
    fn handle_req(&self, req: &KeeperRequest) -> KeeperReply {
        let reply = match req {
            KeeperRequest::GetBacks => {
                self.get_backs().map(|backs| KeeperReply::GetBacks { backs })
            }
            KeeperRequest::GetId => {
                self.get_id().map(|id| KeeperReply::GetId { id })
            }
        };
        reply.unwrap_or_else(|e| KeeperReply::Error { msg: e.to_string() })
    }
}

/// Starts a keeper as described by `kc`: validates the configuration, binds
/// the membership listener, reports readiness, then launches clock
/// synchronization over all backends as a detached task. Returns once all
/// of that is running; startup failures are reported on `kc.ready` and
/// returned.
pub async fn serve_keeper(kc: KeeperConfig) -> Result<(), TribError> {
    if let Err(e) = kc.validate() {
        pf_error!("keeper config rejected: {}", e);
        notify_ready(&kc.ready, false).await;
        return Err(e);
    }

    let addr = kc.addr()?.to_string();
    let listener = match TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            pf_error!("error binding keeper on '{}': {}", addr, e);
            notify_ready(&kc.ready, false).await;
            return Err(e.into());
        }
    };

    let keeper = Keeper::new(&kc);
    tokio::spawn(keeper_acceptor_task(keeper, listener, kc.shutdown));
    pf_info!("keeper {} serving membership on '{}'", kc.id, addr);
    notify_ready(&kc.ready, true).await;

    let backs: Vec<Arc<dyn Storage>> = kc
        .backs
        .iter()
        .map(|addr| Arc::new(StorageClient::new(addr.as_str())) as Arc<dyn Storage>)
        .collect();
    tokio::spawn(ClockSync::new(backs).run());

    Ok(())
}

/// Keeper connection acceptor task.
async fn keeper_acceptor_task(
    keeper: Keeper,
    listener: TcpListener,
    mut shutdown: Option<watch::Receiver<bool>>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(keeper_servant_task(
                            keeper.clone(),
                            stream,
                            peer,
                        ));
                    }
                    Err(e) => {
                        pf_warn!("error accepting connection: {}", e);
                    }
                }
            },

            _ = wait_shutdown(&mut shutdown) => {
                pf_info!("keeper listener shutting down");
                break;
            }
        }
    }
}

/// Per-connection servant task: answers requests until the peer closes.
async fn keeper_servant_task(
    keeper: Keeper,
    mut conn: TcpStream,
    peer: SocketAddr,
) {
    loop {
        let req: KeeperRequest = match read_frame(&mut conn).await {
            Ok(Some(req)) => req,
            Ok(None) => break,
            Err(e) => {
                pf_error!("error reading request from {}: {}", peer, e);
                break;
            }
        };

        let reply = keeper.handle_req(&req);
        if let Err(e) = write_frame(&reply, &mut conn).await {
            pf_error!("error replying to {}: {}", peer, e);
            break;
        }
    }
}
