//! `.framework` bundles

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{FileHandling, GraphDependency};

use crate::error::LoaderError;
use crate::metadata::BinaryInspecting;

#[derive(Clone)]
pub struct FrameworkLoader {
    file_handler: Arc<dyn FileHandling>,
    inspector: Arc<dyn BinaryInspecting>,
}

impl FrameworkLoader {
    pub fn new(file_handler: Arc<dyn FileHandling>, inspector: Arc<dyn BinaryInspecting>) -> Self {
        FrameworkLoader {
            file_handler,
            inspector,
        }
    }

    /// Builds a framework node for the bundle at `path`.
    ///
    /// The dSYM and `.bcsymbolmap` files are looked up next to the bundle, the
    /// way Carthage and `xcodebuild -archivePath` lay them out.
    pub fn load(&self, path: &Path) -> Result<GraphDependency, LoaderError> {
        if !self.file_handler.exists(path) {
            return Err(LoaderError::FrameworkNotFound(path.to_path_buf()));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let binary_path = path.join(&name);

        let dsym_path = sibling(path, &format!("{name}.framework.dSYM"))
            .filter(|p| self.file_handler.exists(p));

        let mut bcsymbolmap_paths: Vec<PathBuf> = self
            .inspector
            .uuids(&binary_path)?
            .into_iter()
            .filter_map(|uuid| {
                let file = format!("{}.bcsymbolmap", uuid.to_string().to_uppercase());
                sibling(path, &file)
            })
            .filter(|p| self.file_handler.exists(p))
            .collect();
        bcsymbolmap_paths.sort();

        let linking = self.inspector.linking(&binary_path)?;
        let architectures = self.inspector.architectures(&binary_path)?;
        let is_carthage = path.to_string_lossy().contains("Carthage/Build");

        tracing::debug!(
            "Loaded framework {} ({:?}, {} slices)",
            path.display(),
            linking,
            architectures.len()
        );
        Ok(GraphDependency::Framework {
            path: path.to_path_buf(),
            binary_path,
            dsym_path,
            bcsymbolmap_paths,
            linking,
            architectures,
            is_carthage,
        })
    }
}

fn sibling(path: &Path, file_name: &str) -> Option<PathBuf> {
    path.parent().map(|parent| parent.join(file_name))
}
