//! `Tuist/Config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Location of the config file relative to the project root.
pub const CONFIG_PATH: &str = "Tuist/Config.toml";

/// Environment variable holding the cloud token.
pub const TOKEN_ENV: &str = "TUIST_CONFIG_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cloud: Option<CloudConfig>,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub url: String,
    pub project_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CloudConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Relative paths are resolved against the project root.
    pub directory: PathBuf,
    /// Name of the profile used when none is given on the command line.
    pub profile: Option<String>,
    pub profiles: Vec<CacheProfileConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            directory: PathBuf::from(".tuist-cache"),
            profile: None,
            profiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheProfileConfig {
    pub name: String,
    pub configuration: String,
}

impl Config {
    /// Loads `<root>/Tuist/Config.toml`, or the defaults if there is none.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_PATH);
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&text, &path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn cache_directory(&self, root: &Path) -> PathBuf {
        if self.cache.directory.is_absolute() {
            self.cache.directory.clone()
        } else {
            root.join(&self.cache.directory)
        }
    }

    /// The requested profile, the configured default, or Debug.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<CacheProfileConfig, ConfigError> {
        match name.or(self.cache.profile.as_deref()) {
            Some(name) => self
                .cache
                .profiles
                .iter()
                .find(|p| p.name == name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownProfile(name.to_string())),
            None => Ok(CacheProfileConfig {
                name: "Development".to_string(),
                configuration: "Debug".to_string(),
            }),
        }
    }
}
