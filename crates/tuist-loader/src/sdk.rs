//! System SDK frameworks and libraries

use std::path::PathBuf;

use tuist_graph::{GraphDependency, GraphError, Platform, SdkSource, SdkStatus};

pub const DEFAULT_DEVELOPER_DIR: &str = "/Applications/Xcode.app/Contents/Developer";

#[derive(Debug, Clone)]
pub struct SystemFrameworkLoader {
    developer_dir: PathBuf,
}

impl Default for SystemFrameworkLoader {
    fn default() -> Self {
        SystemFrameworkLoader::new(DEFAULT_DEVELOPER_DIR)
    }
}

impl SystemFrameworkLoader {
    pub fn new(developer_dir: impl Into<PathBuf>) -> Self {
        SystemFrameworkLoader {
            developer_dir: developer_dir.into(),
        }
    }

    /// `UIKit.framework` and `libz.tbd` style names.
    pub fn load(&self, name: &str, status: SdkStatus) -> Result<GraphDependency, GraphError> {
        let path = match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("framework") => PathBuf::from("/System/Library/Frameworks").join(name),
            Some("tbd") => PathBuf::from("/usr/lib").join(name),
            _ => return Err(GraphError::UnsupportedSdk(name.to_string())),
        };
        Ok(GraphDependency::Sdk {
            name: name.to_string(),
            path,
            status,
            source: SdkSource::System,
        })
    }

    /// XCTest ships with the platform's developer directory, not the SDK.
    pub fn load_xctest(&self, platform: Platform) -> GraphDependency {
        let path = self
            .developer_dir
            .join("Platforms")
            .join(format!("{}.platform", platform.xcode_platform()))
            .join("Developer/Library/Frameworks/XCTest.framework");
        GraphDependency::Sdk {
            name: "XCTest.framework".to_string(),
            path,
            status: SdkStatus::Required,
            source: SdkSource::Developer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn sdk_paths_by_extension() {
        let loader = SystemFrameworkLoader::default();
        let uikit = loader.load("UIKit.framework", SdkStatus::Required).unwrap();
        assert_eq!(uikit.path(), Path::new("/System/Library/Frameworks/UIKit.framework"));

        let libz = loader.load("libz.tbd", SdkStatus::Optional).unwrap();
        assert_eq!(libz.path(), Path::new("/usr/lib/libz.tbd"));

        assert_eq!(
            loader.load("libc++.dylib", SdkStatus::Required).unwrap_err(),
            GraphError::UnsupportedSdk("libc++.dylib".into())
        );
    }

    #[test]
    fn xctest_comes_from_developer_dir() {
        let loader = SystemFrameworkLoader::new("/Xcode/Developer");
        let xctest = loader.load_xctest(Platform::IOS);
        assert_eq!(
            xctest.path(),
            Path::new("/Xcode/Developer/Platforms/iPhoneOS.platform/Developer/Library/Frameworks/XCTest.framework")
        );
    }
}
