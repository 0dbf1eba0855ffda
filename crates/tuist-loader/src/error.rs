use std::path::PathBuf;

use tuist_graph::{BinaryArchitecture, FatalError, FsError, GraphError, Severity};

/// Errors raised while turning manifests and precompiled artifacts into graph nodes.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("couldn't find metadata for binary at path {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("couldn't find architectures for binary at path {}", .0.display())]
    ArchitecturesNotFound(PathBuf),

    #[error("couldn't find framework at {}", .0.display())]
    FrameworkNotFound(PathBuf),

    #[error("couldn't find library at {}", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("couldn't find library public headers at {}", .0.display())]
    PublicHeadersNotFound(PathBuf),

    #[error("couldn't find Swift module map at {}", .0.display())]
    ModuleMapNotFound(PathBuf),

    #[error("couldn't find xcframework at {}", .0.display())]
    XCFrameworkNotFound(PathBuf),

    #[error("couldn't decode Info.plist of {}: {reason}", .path.display())]
    InvalidInfoPlist { path: PathBuf, reason: String },

    #[error("{} doesn't contain a library slice for {}", .0.display(), .1)]
    MissingLibrarySlice(PathBuf, BinaryArchitecture),

    #[error("couldn't find manifest at {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("couldn't decode manifest at {}: {reason}", .path.display())]
    ManifestDecode { path: PathBuf, reason: String },

    #[error("{}", format_globs(.0))]
    InvalidGlobs(Vec<InvalidGlob>),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl FatalError for LoaderError {
    fn severity(&self) -> Severity {
        match self {
            LoaderError::Graph(e) => e.severity(),
            LoaderError::Fs(e) => e.severity(),
            _ => Severity::Abort,
        }
    }
}

/// A source or resource glob that points at a directory that doesn't exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGlob {
    pub target: String,
    pub pattern: String,
}

fn format_globs(globs: &[InvalidGlob]) -> String {
    let mut out = String::from("the following globs don't match an existing directory:");
    for glob in globs {
        out.push_str(&format!("\n  - {}: {}", glob.target, glob.pattern));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_globs_are_listed_together() {
        let err = LoaderError::InvalidGlobs(vec![
            InvalidGlob {
                target: "App".into(),
                pattern: "Sources/**/*.swift".into(),
            },
            InvalidGlob {
                target: "B".into(),
                pattern: "Resources/*.png".into(),
            },
        ]);
        insta::assert_snapshot!(err.to_string(), @r"
        the following globs don't match an existing directory:
          - App: Sources/**/*.swift
          - B: Resources/*.png
        ");
    }

    #[test]
    fn graph_errors_keep_their_severity() {
        let err: LoaderError = GraphError::Cycle(vec!["A".into(), "A".into()]).into();
        assert_eq!(err.severity(), Severity::Abort);
    }
}
