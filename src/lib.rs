//! Tribstore: a sharded key-value and list storage cluster with logical
//! clocks, plus the Tribbler social service built on top of it.

#[macro_use]
mod utils;

mod binstore;
mod front;
mod keeper;
mod rpc;
mod storage;

pub use crate::utils::{logger_init, TribError, ME};

#[doc(hidden)]
pub use crate::utils::me_prefix;

pub use crate::storage::{KeyList, KeyString, KeyValue, MemStorage, Pattern, Storage};

pub use crate::rpc::{new_client, serve_back, BackConfig, StorageClient};

pub use crate::keeper::{
    serve_keeper, ClockSync, Keeper, KeeperClient, KeeperConfig,
    CLOCK_SYNC_INTERVAL,
};

pub use crate::binstore::{new_bin_client, Bin, BinClient, BinStorage, BIN_SEPARATOR};

pub use crate::front::{
    is_valid_username, new_front, Front, FrontConfig, Server, Trib,
    MAX_FOLLOWING, MAX_TRIB_FETCH, MAX_TRIB_LEN, MAX_USERNAME_LEN,
    MIN_LIST_USER, USER_BIN,
};
