//! Remote procedure exposure of the storage interface.

mod client;
mod messages;
mod server;

pub use client::{new_client, StorageClient};
pub use messages::{
    KeeperReply, KeeperRequest, StorageReply, StorageRequest, StorageResult,
};
pub use server::{serve_back, BackConfig};

pub(crate) use server::{notify_ready, wait_shutdown};
