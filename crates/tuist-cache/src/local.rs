//! Artifacts on the local disk: `<cache>/BinaryCache/<hash>/<bundle>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{CacheDirectories, FileHandling};

use crate::error::CacheError;
use crate::storage::CacheStoring;

#[derive(Clone)]
pub struct CacheLocalStorage {
    directories: CacheDirectories,
    file_handler: Arc<dyn FileHandling>,
}

impl CacheLocalStorage {
    pub fn new(directories: CacheDirectories, file_handler: Arc<dyn FileHandling>) -> Self {
        CacheLocalStorage {
            directories,
            file_handler,
        }
    }

    fn bundle(&self, hash: &str) -> Result<Option<PathBuf>, CacheError> {
        let dir = self.directories.artifact_dir(hash);
        if !self.file_handler.is_dir(&dir) {
            return Ok(None);
        }
        Ok(self
            .file_handler
            .list(&dir)?
            .into_iter()
            .find(|path| is_bundle(path)))
    }
}

/// `.framework` and `.xcframework` directories.
pub(crate) fn is_bundle(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "framework" || ext == "xcframework")
}

#[async_trait::async_trait]
impl CacheStoring for CacheLocalStorage {
    async fn exists(&self, hash: &str) -> Result<bool, CacheError> {
        Ok(self.bundle(hash)?.is_some())
    }

    async fn fetch(&self, hash: &str) -> Result<PathBuf, CacheError> {
        self.bundle(hash)?
            .ok_or_else(|| CacheError::NotFound(hash.to_string()))
    }

    async fn store(&self, hash: &str, path: &Path) -> Result<(), CacheError> {
        let Some(name) = path.file_name() else {
            return Err(CacheError::Archive {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
            });
        };
        let dir = self.directories.artifact_dir(hash);
        self.file_handler.delete(&dir)?;
        self.file_handler.create_dir_all(&dir)?;
        self.file_handler.copy(path, &dir.join(name))?;
        tracing::debug!("Stored {} locally as {}", path.display(), hash);
        Ok(())
    }
}
