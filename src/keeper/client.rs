//! Keeper RPC client stub.

use crate::rpc::{KeeperReply, KeeperRequest};
use crate::utils::{read_frame, write_frame, TribError};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Client stub for querying a keeper's membership information. Like the
/// storage client, every call uses a fresh connection.
#[derive(Debug, Clone)]
pub struct KeeperClient {
    /// Keeper address in `host:port` form.
    addr: String,
}

impl KeeperClient {
    /// Creates a new client stub for keeper `addr`. Does not connect.
    pub fn new(addr: impl Into<String>) -> Self {
        KeeperClient { addr: addr.into() }
    }

    async fn call(&self, req: KeeperRequest) -> Result<KeeperReply, TribError> {
        let mut conn = TcpStream::connect(self.addr.as_str()).await?;
        let result = async {
            write_frame(&req, &mut conn).await?;
            match read_frame(&mut conn).await? {
                Some(KeeperReply::Error { msg }) => Err(TribError::Msg(msg)),
                Some(reply) => Ok(reply),
                None => Err(TribError::msg(format!(
                    "keeper '{}' closed before reply",
                    self.addr
                ))),
            }
        }
        .await;
        let closed = conn.shutdown().await;

        let reply = result?;
        closed?;
        Ok(reply)
    }

    /// Queries the backend address list.
    pub async fn get_backs(&self) -> Result<Vec<String>, TribError> {
        match self.call(KeeperRequest::GetBacks).await? {
            KeeperReply::GetBacks { backs } => Ok(backs),
            reply => Err(TribError::msg(format!(
                "Keeper.GetBacks got mismatched reply {:?}",
                reply
            ))),
        }
    }

    /// Queries the keeper's ordinal.
    pub async fn get_id(&self) -> Result<u64, TribError> {
        match self.call(KeeperRequest::GetId).await? {
            KeeperReply::GetId { id } => Ok(id),
            reply => Err(TribError::msg(format!(
                "Keeper.GetId got mismatched reply {:?}",
                reply
            ))),
        }
    }
}
