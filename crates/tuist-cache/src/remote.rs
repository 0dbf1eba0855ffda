//! Artifacts on the cloud cache

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{CacheDirectories, FileHandling};

use crate::archiver;
use crate::cloud::CloudClient;
use crate::error::{CacheError, CloudClientError};
use crate::local::is_bundle;
use crate::resources::CacheResources;
use crate::storage::CacheStoring;

#[derive(Clone)]
pub struct CacheRemoteStorage {
    client: CloudClient,
    resources: CacheResources,
    directories: CacheDirectories,
    file_handler: Arc<dyn FileHandling>,
}

impl CacheRemoteStorage {
    pub fn new(
        client: CloudClient,
        resources: CacheResources,
        directories: CacheDirectories,
        file_handler: Arc<dyn FileHandling>,
    ) -> Self {
        CacheRemoteStorage {
            client,
            resources,
            directories,
            file_handler,
        }
    }
}

#[async_trait::async_trait]
impl CacheStoring for CacheRemoteStorage {
    /// Any status outside 2xx reads as a miss. Only failing to reach the
    /// server is an error.
    async fn exists(&self, hash: &str) -> Result<bool, CacheError> {
        match self.client.request(self.resources.exists(hash)).await {
            Ok(_) => Ok(true),
            Err(CloudClientError::Server { status, .. })
            | Err(CloudClientError::UnexpectedStatus { status, .. }) => {
                tracing::debug!("Remote cache miss for {} (status {})", hash, status);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Downloads the archive and unpacks it into the artifact directory for
    /// `hash`, returning the bundle at its root.
    async fn fetch(&self, hash: &str) -> Result<PathBuf, CacheError> {
        let (response, _) = self.client.request(self.resources.fetch(hash)).await?;
        let bytes = self.client.download(&response.data.url).await?;
        tracing::debug!("Downloaded {} bytes for {}", bytes.len(), hash);

        let destination = self.directories.artifact_dir(hash);
        let file_handler = self.file_handler.clone();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            file_handler.delete(&destination)?;
            archiver::unarchive(&bytes, &destination)?;
            file_handler
                .list(&destination)?
                .into_iter()
                .find(|path| is_bundle(path))
                .ok_or(CacheError::NotFound(hash))
        })
        .await?
    }

    async fn store(&self, hash: &str, path: &Path) -> Result<(), CacheError> {
        let source = path.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || archiver::archive(&source)).await??;
        let content_md5 = archiver::content_md5(&bytes);

        let (response, _) = self
            .client
            .request(self.resources.store(hash, &content_md5))
            .await?;
        let status = self
            .client
            .upload(&response.data.url, bytes, &content_md5)
            .await?;
        if !status.is_success() {
            return Err(CacheError::UploadFailed {
                hash: hash.to_string(),
                status: status.as_u16(),
            });
        }
        let (verified, _) = self
            .client
            .request(self.resources.verify_upload(hash, &content_md5))
            .await?;
        tracing::info!(
            "Uploaded {} ({} bytes)",
            hash,
            verified.data.uploaded_size
        );
        Ok(())
    }
}
