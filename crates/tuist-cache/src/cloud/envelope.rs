//! JSON bodies exchanged with the cloud API

use std::fmt;

use serde::{Deserialize, Serialize};

/// `{ "status": "success", "data": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudResponse<T> {
    pub status: String,
    pub data: T,
}

/// `{ "status": "error", "errors": [{ "code": ..., "message": ... }] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudResponseError {
    pub status: String,
    #[serde(default)]
    pub errors: Vec<CloudErrorItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudErrorItem {
    pub code: String,
    pub message: String,
}

impl fmt::Display for CloudResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "request failed with status '{}'", self.status);
        }
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("\n"))
    }
}

/// A pre-signed URL to download from or upload to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudCacheResponse {
    pub url: String,
    pub expires_at: i64,
}

/// `HEAD` requests carry no body; only the status matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudHeadResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudVerifyUploadResponse {
    pub uploaded_size: u64,
}
