//! Tuist Graph — dependency model, value graph, config and file system access

pub mod cache;
pub mod config;
pub mod context;
pub mod dependency;
pub mod dot;
pub mod error;
pub mod fs;
pub mod graph;
pub mod model;

#[cfg(test)]
pub mod tests;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::CacheDirectories;
pub use config::{CacheProfileConfig, CloudConfig, Config};
pub use context::{CiChecking, Clock, Context, EnvCiChecker, FixedClock, StaticCiChecker, SystemClock};
pub use dependency::{GraphDependency, XCFrameworkInfoPlist, XCFrameworkLibrary};
pub use error::{ConfigError, FatalError, FsError, GraphError, Severity};
pub use fs::{FileHandler, FileHandling};
pub use graph::{CycleDetector, ValueGraph};
pub use model::{
    BinaryArchitecture, BinaryLinking, GraphTarget, Package, Platform, Product, Project,
    SdkSource, SdkStatus, Target, TargetDependency, Workspace,
};
