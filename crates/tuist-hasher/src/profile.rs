use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tuist_graph::CacheProfileConfig;

/// Build configuration the cached binaries were produced with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheProfile {
    pub name: String,
    pub configuration: String,
}

impl CacheProfile {
    pub fn new(name: impl Into<String>, configuration: impl Into<String>) -> Self {
        CacheProfile {
            name: name.into(),
            configuration: configuration.into(),
        }
    }
}

impl Default for CacheProfile {
    fn default() -> Self {
        CacheProfile::new("Development", "Debug")
    }
}

impl From<CacheProfileConfig> for CacheProfile {
    fn from(config: CacheProfileConfig) -> Self {
        CacheProfile::new(config.name, config.configuration)
    }
}

/// Kind of bundle stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutputType {
    Framework,
    #[default]
    #[serde(rename = "xcframework")]
    XCFramework,
}

impl CacheOutputType {
    pub fn bundle_extension(&self) -> &'static str {
        match self {
            CacheOutputType::Framework => "framework",
            CacheOutputType::XCFramework => "xcframework",
        }
    }
}

impl fmt::Display for CacheOutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bundle_extension())
    }
}

impl FromStr for CacheOutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "framework" => Ok(CacheOutputType::Framework),
            "xcframework" => Ok(CacheOutputType::XCFramework),
            other => Err(format!("unknown cache output type '{other}'")),
        }
    }
}
