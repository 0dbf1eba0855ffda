//! Graph nodes: every kind of thing a target can depend on

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{BinaryArchitecture, BinaryLinking, Platform, SdkSource, SdkStatus};

/// A node of the [`crate::ValueGraph`].
///
/// Equality, hashing and ordering look only at the node's identity (kind, name
/// and path), so a precompiled binary whose metadata was refreshed is still the
/// same node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphDependency {
    #[serde(rename = "xcframework")]
    XCFramework {
        path: PathBuf,
        info_plist: XCFrameworkInfoPlist,
        primary_binary_path: PathBuf,
        linking: BinaryLinking,
    },
    Framework {
        path: PathBuf,
        binary_path: PathBuf,
        dsym_path: Option<PathBuf>,
        bcsymbolmap_paths: Vec<PathBuf>,
        linking: BinaryLinking,
        architectures: Vec<BinaryArchitecture>,
        is_carthage: bool,
    },
    Library {
        path: PathBuf,
        public_headers: PathBuf,
        linking: BinaryLinking,
        architectures: Vec<BinaryArchitecture>,
        swift_module_map: Option<PathBuf>,
    },
    PackageProduct {
        path: PathBuf,
        product: String,
    },
    Target {
        name: String,
        path: PathBuf,
    },
    Sdk {
        name: String,
        path: PathBuf,
        status: SdkStatus,
        source: SdkSource,
    },
    Cocoapods {
        path: PathBuf,
    },
}

impl GraphDependency {
    pub fn target(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        GraphDependency::Target {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            GraphDependency::XCFramework { path, .. }
            | GraphDependency::Framework { path, .. }
            | GraphDependency::Library { path, .. }
            | GraphDependency::PackageProduct { path, .. }
            | GraphDependency::Target { path, .. }
            | GraphDependency::Sdk { path, .. }
            | GraphDependency::Cocoapods { path } => path,
        }
    }

    /// Human name: the target or product name, or the last path component.
    pub fn name(&self) -> String {
        match self {
            GraphDependency::Target { name, .. } | GraphDependency::Sdk { name, .. } => {
                name.clone()
            }
            GraphDependency::PackageProduct { product, .. } => product.clone(),
            GraphDependency::XCFramework { path, .. }
            | GraphDependency::Framework { path, .. }
            | GraphDependency::Library { path, .. }
            | GraphDependency::Cocoapods { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, GraphDependency::Target { .. })
    }

    /// Frameworks, xcframeworks and libraries.
    pub fn is_precompiled(&self) -> bool {
        matches!(
            self,
            GraphDependency::XCFramework { .. }
                | GraphDependency::Framework { .. }
                | GraphDependency::Library { .. }
        )
    }

    /// Dependencies a cached binary keeps from the target it replaced.
    /// Libraries and packages are linked into the binary; frameworks and SDKs
    /// still have to be linked by whoever links the binary.
    pub fn is_linked_dynamically(&self) -> bool {
        matches!(
            self,
            GraphDependency::XCFramework { .. }
                | GraphDependency::Framework { .. }
                | GraphDependency::Sdk { .. }
        )
    }

    pub fn linking(&self) -> Option<BinaryLinking> {
        match self {
            GraphDependency::XCFramework { linking, .. }
            | GraphDependency::Framework { linking, .. }
            | GraphDependency::Library { linking, .. } => Some(*linking),
            GraphDependency::PackageProduct { .. }
            | GraphDependency::Target { .. }
            | GraphDependency::Sdk { .. }
            | GraphDependency::Cocoapods { .. } => None,
        }
    }

    /// `(path, name)` when this node is a target.
    pub fn target_reference(&self) -> Option<(&Path, &str)> {
        match self {
            GraphDependency::Target { name, path } => Some((path.as_path(), name.as_str())),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            GraphDependency::Target { .. } => 0,
            GraphDependency::Framework { .. } => 1,
            GraphDependency::XCFramework { .. } => 2,
            GraphDependency::Library { .. } => 3,
            GraphDependency::PackageProduct { .. } => 4,
            GraphDependency::Sdk { .. } => 5,
            GraphDependency::Cocoapods { .. } => 6,
        }
    }

    fn identity(&self) -> (u8, String, &Path) {
        (self.rank(), self.name(), self.path())
    }
}

impl PartialEq for GraphDependency {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for GraphDependency {}

impl Hash for GraphDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for GraphDependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphDependency {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for GraphDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            GraphDependency::XCFramework { .. } => "xcframework",
            GraphDependency::Framework { .. } => "framework",
            GraphDependency::Library { .. } => "library",
            GraphDependency::PackageProduct { .. } => "package",
            GraphDependency::Target { .. } => "target",
            GraphDependency::Sdk { .. } => "sdk",
            GraphDependency::Cocoapods { .. } => "cocoapods",
        };
        write!(f, "{kind} '{}'", self.name())
    }
}

/// Decoded `Info.plist` of an `.xcframework`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XCFrameworkInfoPlist {
    #[serde(rename = "AvailableLibraries")]
    pub libraries: Vec<XCFrameworkLibrary>,
}

/// One platform slice of an `.xcframework`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XCFrameworkLibrary {
    #[serde(rename = "LibraryIdentifier")]
    pub identifier: String,
    #[serde(rename = "LibraryPath")]
    pub path: PathBuf,
    #[serde(rename = "SupportedArchitectures")]
    pub architectures: Vec<BinaryArchitecture>,
    #[serde(rename = "SupportedPlatform", default)]
    pub platform: Option<String>,
}

impl XCFrameworkLibrary {
    /// Whether this slice targets `platform` (by Info.plist platform name).
    pub fn supports(&self, platform: Platform) -> bool {
        let wanted = match platform {
            Platform::IOS => "ios",
            Platform::MacOS => "macos",
            Platform::TvOS => "tvos",
            Platform::WatchOS => "watchos",
        };
        self.platform.as_deref().is_none_or(|p| p == wanted)
    }
}
