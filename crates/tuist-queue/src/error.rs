use uuid::Uuid;

use tuist_graph::{FatalError, FsError, Severity};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("couldn't encode event {id}: {source}")]
    Encode {
        id: Uuid,
        source: serde_json::Error,
    },

    #[error("couldn't decode persisted event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no dispatcher registered for '{0}'")]
    DispatcherNotFound(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl FatalError for QueueError {
    fn severity(&self) -> Severity {
        match self {
            QueueError::Encode { .. } => Severity::Bug,
            QueueError::Fs(e) => e.severity(),
            QueueError::Decode(_) | QueueError::DispatcherNotFound(_) | QueueError::Dispatch(_) => {
                Severity::Abort
            }
        }
    }
}
