//! Manifests, precompiled artifacts and graph assembly

pub mod error;
pub mod framework;
pub mod graph_loader;
pub mod library;
pub mod linter;
pub mod manifest;
pub mod metadata;
pub mod sdk;
pub mod xcframework;


pub use error::{InvalidGlob, LoaderError};
pub use framework::FrameworkLoader;
pub use graph_loader::GraphLoader;
pub use library::LibraryLoader;
pub use linter::lint_globs;
pub use manifest::{ManifestLoader, ManifestLoading, ModelLoader};
pub use metadata::{BinaryInspecting, MachOInspector};
pub use sdk::SystemFrameworkLoader;
pub use xcframework::XCFrameworkLoader;
