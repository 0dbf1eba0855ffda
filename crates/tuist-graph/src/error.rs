//! Error taxonomy shared by every crate in the workspace

use std::path::PathBuf;

/// How an error should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caused by the user's project or environment. Reported with an
    /// actionable message and a non-zero exit code.
    Abort,
    /// An internal invariant was violated. Should never happen.
    Bug,
}

/// Errors that know their own severity.
pub trait FatalError: std::error::Error {
    fn severity(&self) -> Severity;
}

/// Errors raised while building or querying a graph.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("found circular dependency between targets: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("couldn't find project at {}", .0.display())]
    MissingProject(PathBuf),

    #[error("target '{}' not found in project at {}", .0, .1.display())]
    TargetNotFound(String, PathBuf),

    #[error("the SDK type of {0} is not currently supported, only framework and tbd are supported")]
    UnsupportedSdk(String),
}

impl FatalError for GraphError {
    fn severity(&self) -> Severity {
        match self {
            GraphError::Cycle(_)
            | GraphError::MissingProject(_)
            | GraphError::TargetNotFound(_, _)
            | GraphError::UnsupportedSdk(_) => Severity::Abort,
        }
    }
}

/// Errors raised by [`crate::fs::FileHandling`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
}

impl FsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsError::Io {
            path: path.into(),
            source,
        }
    }
}

impl FatalError for FsError {
    fn severity(&self) -> Severity {
        Severity::Abort
    }
}

/// Errors raised while reading `Tuist/Config.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cache profile '{0}' is not defined in the config")]
    UnknownProfile(String),
}

impl FatalError for ConfigError {
    fn severity(&self) -> Severity {
        Severity::Abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_the_path() {
        let err = GraphError::Cycle(vec!["A".into(), "B".into(), "A".into()]);
        insta::assert_snapshot!(err.to_string(), @"found circular dependency between targets: A -> B -> A");
        assert_eq!(err.severity(), Severity::Abort);
    }

    #[test]
    fn io_error_display() {
        let err = FsError::io(
            "/tmp/cache/manifest.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("manifest.json"));
    }
}
