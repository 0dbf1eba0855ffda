use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use tuist_graph::CloudConfig;

use crate::cloud::resource::HttpResource;
use crate::error::{CacheError, CloudClientError};

/// Authenticated access to the cloud API.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CloudClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        reqwest::Url::parse(base_url).map_err(|e| CacheError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CacheError::Client)?;
        Ok(CloudClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &CloudConfig, token: Option<String>) -> Result<Self, CacheError> {
        CloudClient::new(&config.url, token, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the resource and decodes the body.
    ///
    /// 2xx bodies decode into `T` (an empty body reads as JSON `null`);
    /// anything else decodes into `E` when it can.
    pub async fn request<T, E>(
        &self,
        resource: HttpResource<T, E>,
    ) -> Result<(T, StatusCode), CloudClientError<E>>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, resource.path);
        let mut request = self
            .http
            .request(resource.method.clone(), &url)
            .query(&resource.query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        for (key, value) in &resource.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &resource.body {
            request = request.json(body);
        }

        let session = |source| CloudClientError::Session {
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(session)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(session)?;
        tracing::debug!("{} {} -> {}", resource.method, url, status);

        if status.is_success() {
            let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return match serde_json::from_slice::<T>(body) {
                Ok(value) => Ok((value, status)),
                Err(_) if bytes.is_empty() => Err(CloudClientError::MissingData {
                    url,
                    status: status.as_u16(),
                }),
                Err(e) => Err(CloudClientError::Decode {
                    url,
                    reason: e.to_string(),
                }),
            };
        }

        match serde_json::from_slice::<E>(&bytes) {
            Ok(error) => Err(CloudClientError::Server {
                url,
                status: status.as_u16(),
                error,
            }),
            Err(_) => Err(CloudClientError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }

    /// Downloads from a pre-signed URL. No credentials are sent.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let transfer = |source| CacheError::Download {
            url: url.to_string(),
            source,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transfer)?;
        let bytes = response.bytes().await.map_err(transfer)?;
        Ok(bytes.to_vec())
    }

    /// Uploads a gzipped archive to a pre-signed URL.
    pub async fn upload(
        &self,
        url: &str,
        bytes: Vec<u8>,
        content_md5: &str,
    ) -> Result<StatusCode, CacheError> {
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/gzip")
            .header("Content-MD5", content_md5)
            .body(bytes)
            .send()
            .await
            .map_err(|source| CacheError::Upload {
                url: url.to_string(),
                source,
            })?;
        Ok(response.status())
    }
}
