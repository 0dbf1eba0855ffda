//! Where cached artifacts live

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::error::CacheError;
use crate::local::CacheLocalStorage;

/// A place artifacts can be looked up in, fetched from and stored to, by
/// content hash.
#[async_trait::async_trait]
pub trait CacheStoring: Send + Sync {
    async fn exists(&self, hash: &str) -> Result<bool, CacheError>;

    /// Path of the local bundle for `hash`, downloading it first if needed.
    async fn fetch(&self, hash: &str) -> Result<PathBuf, CacheError>;

    /// Stores the bundle at `path` under `hash`.
    async fn store(&self, hash: &str, path: &Path) -> Result<(), CacheError>;
}

/// The local cache in front of any number of remote ones.
///
/// Remote hits are copied into the local cache so the next lookup stays local.
#[derive(Clone)]
pub struct CacheStorage {
    local: CacheLocalStorage,
    remotes: Vec<Arc<dyn CacheStoring>>,
}

impl CacheStorage {
    pub fn new(local: CacheLocalStorage, remotes: Vec<Arc<dyn CacheStoring>>) -> Self {
        CacheStorage { local, remotes }
    }
}

#[async_trait::async_trait]
impl CacheStoring for CacheStorage {
    async fn exists(&self, hash: &str) -> Result<bool, CacheError> {
        if self.local.exists(hash).await? {
            return Ok(true);
        }
        for remote in &self.remotes {
            if remote.exists(hash).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn fetch(&self, hash: &str) -> Result<PathBuf, CacheError> {
        if self.local.exists(hash).await? {
            return self.local.fetch(hash).await;
        }
        for remote in &self.remotes {
            if !remote.exists(hash).await? {
                continue;
            }
            let path = remote.fetch(hash).await?;
            // Remotes may already unpack into the local layout.
            if !self.local.exists(hash).await? {
                self.local.store(hash, &path).await?;
            }
            return self.local.fetch(hash).await;
        }
        Err(CacheError::NotFound(hash.to_string()))
    }

    async fn store(&self, hash: &str, path: &Path) -> Result<(), CacheError> {
        self.local.store(hash, path).await?;
        try_join_all(self.remotes.iter().map(|remote| remote.store(hash, path))).await?;
        Ok(())
    }
}
