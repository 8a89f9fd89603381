//! Bin storage: shards named bins over the backends by hashing bin names.

mod bin;

pub use bin::{Bin, BIN_SEPARATOR};

use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

use crate::rpc::StorageClient;
use crate::storage::Storage;
use crate::utils::TribError;

use async_trait::async_trait;

use fnv::FnvHasher;

use tokio::sync::Mutex;

/// Source of bins. Every bin behaves as an independent storage node.
#[async_trait]
pub trait BinStorage: Send + Sync {
    /// Gets the bin named `name`. Empty names and names containing
    /// `BIN_SEPARATOR` are errors.
    async fn bin(&self, name: &str) -> Result<Arc<dyn Storage>, TribError>;
}

/// Creates a bin storage client over the backends at `backs`.
pub fn new_bin_client(backs: Vec<String>) -> Arc<dyn BinStorage> {
    Arc::new(BinClient::new(backs))
}

/// Bin storage client. Routes each bin to backend
/// `fnv1a64(name) % backs.len()` and caches the resulting wrappers.
pub struct BinClient {
    /// Backends in configuration order.
    backs: Vec<Arc<dyn Storage>>,

    /// Map from bin name -> cached wrapper.
    cache: Mutex<HashMap<String, Arc<Bin>>>,
}

impl BinClient {
    /// Creates a bin client with one RPC client stub per backend address.
    pub fn new(backs: Vec<String>) -> Self {
        Self::with_backends(
            backs
                .into_iter()
                .map(|addr| Arc::new(StorageClient::new(addr)) as Arc<dyn Storage>)
                .collect(),
        )
    }

    /// Creates a bin client over already constructed backends.
    pub fn with_backends(backs: Vec<Arc<dyn Storage>>) -> Self {
        BinClient {
            backs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of backends bins are spread over.
    pub fn num_backs(&self) -> usize {
        self.backs.len()
    }

    /// Index of the backend serving bin `name`.
    pub fn backend_index(&self, name: &str) -> Result<usize, TribError> {
        if self.backs.is_empty() {
            return Err(TribError::Config("no backends configured".into()));
        }
        let mut hasher = FnvHasher::default();
        hasher.write(name.as_bytes());
        Ok((hasher.finish() % self.backs.len() as u64) as usize)
    }
}

#[async_trait]
impl BinStorage for BinClient {
    async fn bin(&self, name: &str) -> Result<Arc<dyn Storage>, TribError> {
        if name.is_empty() {
            return Err(TribError::EmptyBinName);
        }
        if name.contains(BIN_SEPARATOR) {
            return Err(TribError::InvalidBinName(name.into()));
        }

        let mut cache = self.cache.lock().await;
        if let Some(bin) = cache.get(name) {
            return Ok(bin.clone() as Arc<dyn Storage>);
        }

        let idx = self.backend_index(name)?;
        let bin = Arc::new(Bin::new(name, self.backs[idx].clone()));
        cache.insert(name.to_string(), bin.clone());
        pf_trace!("bin '{}' routed to back {}", name, idx);
        Ok(bin as Arc<dyn Storage>)
    }
}
