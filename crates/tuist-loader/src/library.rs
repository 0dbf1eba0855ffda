//! Static and dynamic libraries with their public headers

use std::path::Path;
use std::sync::Arc;

use tuist_graph::{FileHandling, GraphDependency};

use crate::error::LoaderError;
use crate::metadata::BinaryInspecting;

#[derive(Clone)]
pub struct LibraryLoader {
    file_handler: Arc<dyn FileHandling>,
    inspector: Arc<dyn BinaryInspecting>,
}

impl LibraryLoader {
    pub fn new(file_handler: Arc<dyn FileHandling>, inspector: Arc<dyn BinaryInspecting>) -> Self {
        LibraryLoader {
            file_handler,
            inspector,
        }
    }

    pub fn load(
        &self,
        path: &Path,
        public_headers: &Path,
        swift_module_map: Option<&Path>,
    ) -> Result<GraphDependency, LoaderError> {
        if !self.file_handler.exists(path) {
            return Err(LoaderError::LibraryNotFound(path.to_path_buf()));
        }
        if !self.file_handler.exists(public_headers) {
            return Err(LoaderError::PublicHeadersNotFound(public_headers.to_path_buf()));
        }
        if let Some(module_map) = swift_module_map {
            if !self.file_handler.exists(module_map) {
                return Err(LoaderError::ModuleMapNotFound(module_map.to_path_buf()));
            }
        }

        Ok(GraphDependency::Library {
            path: path.to_path_buf(),
            public_headers: public_headers.to_path_buf(),
            linking: self.inspector.linking(path)?,
            architectures: self.inspector.architectures(path)?,
            swift_module_map: swift_module_map.map(Path::to_path_buf),
        })
    }
}
