//! Project, target and workspace descriptions as loaded from manifests

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform a target is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(rename = "ios")]
    IOS,
    #[serde(rename = "macos")]
    MacOS,
    #[serde(rename = "tvos")]
    TvOS,
    #[serde(rename = "watchos")]
    WatchOS,
}

impl Platform {
    /// Name of the `.platform` directory inside Xcode's developer directory.
    pub fn xcode_platform(&self) -> &'static str {
        match self {
            Platform::IOS => "iPhoneOS",
            Platform::MacOS => "MacOSX",
            Platform::TvOS => "AppleTVOS",
            Platform::WatchOS => "WatchOS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::IOS => "iOS",
            Platform::MacOS => "macOS",
            Platform::TvOS => "tvOS",
            Platform::WatchOS => "watchOS",
        };
        f.write_str(name)
    }
}

/// What a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    App,
    StaticLibrary,
    DynamicLibrary,
    Framework,
    StaticFramework,
    UnitTests,
    UiTests,
    Bundle,
}

impl Product {
    /// Products that can be replaced by a precompiled binary from the cache.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Product::Framework | Product::StaticFramework)
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Product::UnitTests | Product::UiTests)
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Product::StaticLibrary | Product::StaticFramework)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Product::App => "app",
            Product::StaticLibrary => "static_library",
            Product::DynamicLibrary => "dynamic_library",
            Product::Framework => "framework",
            Product::StaticFramework => "static_framework",
            Product::UnitTests => "unit_tests",
            Product::UiTests => "ui_tests",
            Product::Bundle => "bundle",
        };
        f.write_str(name)
    }
}

/// How other binaries link against a precompiled binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryLinking {
    Static,
    Dynamic,
}

/// CPU architecture slices a binary can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryArchitecture {
    #[serde(rename = "x86_64")]
    X8664,
    #[serde(rename = "i386")]
    I386,
    #[serde(rename = "armv7")]
    Armv7,
    #[serde(rename = "armv7s")]
    Armv7s,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "arm64e")]
    Arm64e,
    #[serde(rename = "arm64_32")]
    Arm6432,
}

impl BinaryArchitecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryArchitecture::X8664 => "x86_64",
            BinaryArchitecture::I386 => "i386",
            BinaryArchitecture::Armv7 => "armv7",
            BinaryArchitecture::Armv7s => "armv7s",
            BinaryArchitecture::Arm64 => "arm64",
            BinaryArchitecture::Arm64e => "arm64e",
            BinaryArchitecture::Arm6432 => "arm64_32",
        }
    }
}

impl fmt::Display for BinaryArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinaryArchitecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" => Ok(BinaryArchitecture::X8664),
            "i386" => Ok(BinaryArchitecture::I386),
            "armv7" => Ok(BinaryArchitecture::Armv7),
            "armv7s" => Ok(BinaryArchitecture::Armv7s),
            "arm64" => Ok(BinaryArchitecture::Arm64),
            "arm64e" => Ok(BinaryArchitecture::Arm64e),
            "arm64_32" => Ok(BinaryArchitecture::Arm6432),
            other => Err(format!("unknown architecture '{other}'")),
        }
    }
}

/// Whether an SDK is weakly or strongly linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkStatus {
    Required,
    Optional,
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkStatus::Required => f.write_str("required"),
            SdkStatus::Optional => f.write_str("optional"),
        }
    }
}

/// Where an SDK lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkSource {
    /// `/System/Library/Frameworks` or `/usr/lib`.
    System,
    /// The platform's developer directory (XCTest and friends).
    Developer,
}

/// A dependency as declared in a manifest, before it's resolved into a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetDependency {
    /// A target within the same project.
    Target { name: String },
    /// A target defined in the project at `path`.
    Project { target: String, path: PathBuf },
    Framework { path: PathBuf },
    Library {
        path: PathBuf,
        public_headers: PathBuf,
        #[serde(default)]
        swift_module_map: Option<PathBuf>,
    },
    #[serde(rename = "xcframework")]
    XCFramework { path: PathBuf },
    Sdk {
        name: String,
        #[serde(default = "default_sdk_status")]
        status: SdkStatus,
    },
    Package { product: String },
    Cocoapods { path: PathBuf },
    Xctest,
}

fn default_sdk_status() -> SdkStatus {
    SdkStatus::Required
}

impl TargetDependency {
    /// Resolves every relative path against `base`.
    pub fn resolved(self, base: &Path) -> Self {
        let abs = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        match self {
            TargetDependency::Project { target, path } => TargetDependency::Project {
                target,
                path: abs(path),
            },
            TargetDependency::Framework { path } => TargetDependency::Framework { path: abs(path) },
            TargetDependency::Library {
                path,
                public_headers,
                swift_module_map,
            } => TargetDependency::Library {
                path: abs(path),
                public_headers: abs(public_headers),
                swift_module_map: swift_module_map.map(abs),
            },
            TargetDependency::XCFramework { path } => {
                TargetDependency::XCFramework { path: abs(path) }
            }
            TargetDependency::Cocoapods { path } => TargetDependency::Cocoapods { path: abs(path) },
            other @ (TargetDependency::Target { .. }
            | TargetDependency::Sdk { .. }
            | TargetDependency::Package { .. }
            | TargetDependency::Xctest) => other,
        }
    }
}

/// A buildable unit inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub platform: Platform,
    pub product: Product,
    #[serde(default)]
    pub bundle_id: String,
    /// Source globs, relative to the project directory.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Resource globs, relative to the project directory.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
    /// Set by graph mappers when the target was replaced by a binary and
    /// should be left out of generated projects.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub prune: bool,
}

impl Target {
    pub fn new(name: impl Into<String>, platform: Platform, product: Product) -> Self {
        let name = name.into();
        Target {
            bundle_id: format!("io.tuist.{name}"),
            name,
            platform,
            product,
            sources: Vec::new(),
            resources: Vec::new(),
            settings: BTreeMap::new(),
            dependencies: Vec::new(),
            prune: false,
        }
    }
}

/// A Swift package referenced by a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Package {
    Local { path: PathBuf },
    Remote { url: String, requirement: String },
}

impl Package {
    pub fn name(&self) -> String {
        match self {
            Package::Local { path } => path.display().to_string(),
            Package::Remote { url, .. } => url.clone(),
        }
    }
}

/// A project: a directory with a manifest and the targets it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub path: PathBuf,
    pub name: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// A collection of projects generated together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub path: PathBuf,
    pub name: String,
    pub projects: Vec<PathBuf>,
}

impl Workspace {
    /// Same workspace, different project membership.
    pub fn replacing_projects(&self, projects: Vec<PathBuf>) -> Self {
        Workspace {
            path: self.path.clone(),
            name: self.name.clone(),
            projects,
        }
    }
}

/// A target together with the directory of the project that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphTarget {
    pub path: PathBuf,
    pub target: Target,
}

impl GraphTarget {
    pub fn new(path: impl Into<PathBuf>, target: Target) -> Self {
        GraphTarget {
            path: path.into(),
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.target.name
    }
}

impl PartialOrd for GraphTarget {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphTarget {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.target.name, &self.path)
            .cmp(&(&other.target.name, &other.path))
            .then_with(|| {
                // Same location, different definition; settle on something stable.
                format!("{:?}", self.target).cmp(&format!("{:?}", other.target))
            })
    }
}
