use std::path::PathBuf;

use tuist_graph::{FatalError, FsError, GraphError, Severity};

#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    /// A dependency was hashed before the target it depends on. The graph
    /// is walked in topological order, so this means an internal bug.
    #[error("missing content hash for target '{name}' at {}", .path.display())]
    MissingTargetHash { name: String, path: PathBuf },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl FatalError for HasherError {
    fn severity(&self) -> Severity {
        match self {
            HasherError::MissingTargetHash { .. } => Severity::Bug,
            HasherError::Graph(e) => e.severity(),
            HasherError::Fs(e) => e.severity(),
        }
    }
}
