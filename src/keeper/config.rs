//! Keeper startup configuration.

use crate::utils::TribError;

use tokio::sync::{mpsc, watch};

/// Keeper configuration.
#[derive(Debug, Default)]
pub struct KeeperConfig {
    /// Addresses of all keepers, in `host:port` form.
    pub addrs: Vec<String>,

    /// Addresses of all backends, in `host:port` form. The order must match
    /// the one given to bin clients.
    pub backs: Vec<String>,

    /// Index of this keeper in `addrs`.
    pub this: usize,

    /// Ordinal reported to clients asking for this keeper's ID.
    pub id: u64,

    /// If set, receives `true` once the keeper is serving, or `false` if
    /// startup failed.
    pub ready: Option<mpsc::Sender<bool>>,

    /// If set, the keeper stops answering membership queries once `true` is
    /// sent. Clock synchronization is unaffected.
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl KeeperConfig {
    /// Checks that every address is non-empty and that `this` indexes into
    /// `addrs`.
    pub fn validate(&self) -> Result<(), TribError> {
        if let Some(i) = self.backs.iter().position(|b| b.is_empty()) {
            return Err(TribError::Config(format!(
                "empty backend address at index {}",
                i
            )));
        }
        if let Some(i) = self.addrs.iter().position(|k| k.is_empty()) {
            return Err(TribError::Config(format!(
                "empty keeper address at index {}",
                i
            )));
        }
        if self.this >= self.addrs.len() {
            return Err(TribError::Config(format!(
                "keeper index {} out of range for {} keepers",
                self.this,
                self.addrs.len()
            )));
        }
        Ok(())
    }

    /// Address this keeper listens on.
    pub fn addr(&self) -> Result<&str, TribError> {
        self.addrs.get(self.this).map(String::as_str).ok_or_else(|| {
            TribError::Config(format!("keeper index {} out of range", self.this))
        })
    }
}
