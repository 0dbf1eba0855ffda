use std::fmt;
use std::path::PathBuf;

use tuist_graph::{FatalError, FsError, GraphError, Severity};
use tuist_hasher::HasherError;
use tuist_loader::LoaderError;

use crate::cloud::CloudResponseError;

/// Failures of a single request against the cloud API.
///
/// `E` is the error body the resource decodes when the server answers with a
/// non-2xx status.
#[derive(Debug, thiserror::Error)]
pub enum CloudClientError<E> {
    #[error("couldn't reach {url}: {source}")]
    Session { url: String, source: reqwest::Error },

    #[error("{url} responded with status {status} but no data")]
    MissingData { url: String, status: u16 },

    #[error("couldn't decode the response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("{url} responded with status {status}: {error}")]
    Server { url: String, status: u16, error: E },

    #[error("{url} responded with unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },
}

impl<E> CloudClientError<E> {
    /// The HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudClientError::Session { .. } => None,
            CloudClientError::MissingData { status, .. }
            | CloudClientError::Server { status, .. }
            | CloudClientError::UnexpectedStatus { status, .. } => Some(*status),
            CloudClientError::Decode { .. } => None,
        }
    }
}

impl<E> FatalError for CloudClientError<E>
where
    E: fmt::Debug + fmt::Display,
{
    fn severity(&self) -> Severity {
        match self {
            // A 2xx we can't read means client and server disagree on the API.
            CloudClientError::Decode { .. } => Severity::Bug,
            CloudClientError::Session { .. }
            | CloudClientError::MissingData { .. }
            | CloudClientError::Server { .. }
            | CloudClientError::UnexpectedStatus { .. } => Severity::Abort,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Cloud(#[from] CloudClientError<CloudResponseError>),

    #[error("invalid cloud URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("couldn't create the HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("couldn't download {url}: {source}")]
    Download { url: String, source: reqwest::Error },

    #[error("couldn't upload to {url}: {source}")]
    Upload { url: String, source: reqwest::Error },

    #[error("uploading the artifact for {hash} failed with status {status}")]
    UploadFailed { hash: String, status: u16 },

    #[error("couldn't archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't unarchive into {}: {source}", .path.display())]
    Unarchive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("there is no cached artifact for hash {0}")]
    NotFound(String),

    #[error("fetching the artifact with hash {hash} failed: {source}")]
    FetchFailed {
        hash: String,
        source: Box<CacheError>,
    },

    #[error("building {target} failed: {reason}")]
    Build { target: String, reason: String },

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Hasher(#[from] HasherError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl FatalError for CacheError {
    fn severity(&self) -> Severity {
        match self {
            CacheError::Cloud(e) => e.severity(),
            CacheError::FetchFailed { source, .. } => source.severity(),
            CacheError::Graph(e) => e.severity(),
            CacheError::Loader(e) => e.severity(),
            CacheError::Hasher(e) => e.severity(),
            CacheError::Fs(e) => e.severity(),
            CacheError::Join(_) => Severity::Bug,
            CacheError::InvalidUrl { .. }
            | CacheError::Client(_)
            | CacheError::Download { .. }
            | CacheError::Upload { .. }
            | CacheError::UploadFailed { .. }
            | CacheError::Archive { .. }
            | CacheError::Unarchive { .. }
            | CacheError::NotFound(_)
            | CacheError::Build { .. } => Severity::Abort,
        }
    }
}
