//! `.xcframework` bundles

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{
    BinaryArchitecture, FileHandling, GraphDependency, XCFrameworkInfoPlist, XCFrameworkLibrary,
};

use crate::error::LoaderError;
use crate::metadata::BinaryInspecting;

#[derive(Clone)]
pub struct XCFrameworkLoader {
    file_handler: Arc<dyn FileHandling>,
    inspector: Arc<dyn BinaryInspecting>,
    preferred_architecture: BinaryArchitecture,
}

impl XCFrameworkLoader {
    pub fn new(file_handler: Arc<dyn FileHandling>, inspector: Arc<dyn BinaryInspecting>) -> Self {
        XCFrameworkLoader {
            file_handler,
            inspector,
            preferred_architecture: BinaryArchitecture::Arm64,
        }
    }

    /// Selects slices for a different architecture than arm64.
    pub fn with_preferred_architecture(mut self, architecture: BinaryArchitecture) -> Self {
        self.preferred_architecture = architecture;
        self
    }

    pub fn load(&self, path: &Path) -> Result<GraphDependency, LoaderError> {
        if !self.file_handler.exists(path) {
            return Err(LoaderError::XCFrameworkNotFound(path.to_path_buf()));
        }
        let info_plist = self.info_plist(path)?;
        let library = info_plist
            .libraries
            .iter()
            .find(|library| library.architectures.contains(&self.preferred_architecture))
            .ok_or_else(|| {
                LoaderError::MissingLibrarySlice(path.to_path_buf(), self.preferred_architecture)
            })?;
        let primary_binary_path = primary_binary_path(path, library);
        let linking = self.inspector.linking(&primary_binary_path)?;

        tracing::debug!(
            "Loaded xcframework {} using slice {}",
            path.display(),
            library.identifier
        );
        Ok(GraphDependency::XCFramework {
            path: path.to_path_buf(),
            info_plist,
            primary_binary_path,
            linking,
        })
    }

    fn info_plist(&self, path: &Path) -> Result<XCFrameworkInfoPlist, LoaderError> {
        let plist_path = path.join("Info.plist");
        let bytes = self.file_handler.read(&plist_path)?;
        plist::from_bytes(&bytes).map_err(|e| LoaderError::InvalidInfoPlist {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// `<xcframework>/<identifier>/B.framework/B`, or the library file itself.
fn primary_binary_path(path: &Path, library: &XCFrameworkLibrary) -> PathBuf {
    let slice = path.join(&library.identifier).join(&library.path);
    if library.path.extension().is_some_and(|ext| ext == "framework") {
        let binary = library
            .path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        slice.join(binary)
    } else {
        slice
    }
}
