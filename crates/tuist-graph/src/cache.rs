//! Layout of the local cache directory

use std::path::{Path, PathBuf};

/// Precompiled artifacts: `<cache>/BinaryCache/<hash>/<bundle>`.
pub const BINARY_CACHE_DIR: &str = "BinaryCache";

/// Persisted queue events.
pub const QUEUE_DIR: &str = "Queue";

/// Downloads being unpacked.
pub const DOWNLOADS_DIR: &str = "Downloads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirectories {
    root: PathBuf,
}

impl CacheDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheDirectories { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn binary_cache(&self) -> PathBuf {
        self.root.join(BINARY_CACHE_DIR)
    }

    /// Directory holding the artifact for one content hash.
    pub fn artifact_dir(&self, hash: &str) -> PathBuf {
        self.binary_cache().join(hash)
    }

    pub fn queue(&self) -> PathBuf {
        self.root.join(QUEUE_DIR)
    }

    pub fn downloads(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    /// Creates every directory of the layout.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [self.binary_cache(), self.queue(), self.downloads()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
        }
        tracing::debug!("Cache directories ready at {}", self.root.display());
        Ok(())
    }

    /// Removes every cached artifact. Queued events survive.
    pub fn clear_binaries(&self) -> std::io::Result<()> {
        let dir = self.binary_cache();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
