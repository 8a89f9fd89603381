//! Cluster coordinator: membership queries and clock synchronization.

mod client;
mod clocksync;
mod config;
mod server;

pub use client::KeeperClient;
pub use clocksync::{ClockSync, CLOCK_SYNC_INTERVAL};
pub use config::KeeperConfig;
pub use server::{serve_keeper, Keeper};
