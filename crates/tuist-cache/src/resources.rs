//! The cache endpoints of the cloud API

use reqwest::Method;

use crate::cloud::{
    CloudCacheResponse, CloudHeadResponse, CloudResponse, CloudResponseError,
    CloudVerifyUploadResponse, HttpResource,
};

const CACHE_PATH: &str = "/api/cache";
const VERIFY_UPLOAD_PATH: &str = "/api/cache/verify_upload";

/// Builds cache requests scoped to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResources {
    project_id: String,
}

impl CacheResources {
    pub fn new(project_id: impl Into<String>) -> Self {
        CacheResources {
            project_id: project_id.into(),
        }
    }

    /// `HEAD /api/cache`: 2xx when an artifact exists for the hash.
    pub fn exists(&self, hash: &str) -> HttpResource<CloudHeadResponse, CloudResponseError> {
        self.scoped(Method::HEAD, CACHE_PATH, hash)
    }

    /// `GET /api/cache`: a download URL for the artifact.
    pub fn fetch(
        &self,
        hash: &str,
    ) -> HttpResource<CloudResponse<CloudCacheResponse>, CloudResponseError> {
        self.scoped(Method::GET, CACHE_PATH, hash)
    }

    /// `POST /api/cache`: an upload URL for an archive with the given MD5.
    pub fn store(
        &self,
        hash: &str,
        content_md5: &str,
    ) -> HttpResource<CloudResponse<CloudCacheResponse>, CloudResponseError> {
        self.scoped(Method::POST, CACHE_PATH, hash)
            .query("content_md5", content_md5)
    }

    /// `POST /api/cache/verify_upload`: confirms the uploaded archive.
    pub fn verify_upload(
        &self,
        hash: &str,
        content_md5: &str,
    ) -> HttpResource<CloudResponse<CloudVerifyUploadResponse>, CloudResponseError> {
        self.scoped(Method::POST, VERIFY_UPLOAD_PATH, hash)
            .query("content_md5", content_md5)
    }

    fn scoped<T, E>(&self, method: Method, path: &str, hash: &str) -> HttpResource<T, E> {
        HttpResource::new(method, path)
            .query("project_id", self.project_id.as_str())
            .query("hash", hash)
    }
}
