//! Collaborators passed explicitly to every component that touches the outside world

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::fs::{FileHandler, FileHandling};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always reads the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Tells whether the process runs on a continuous integration host.
pub trait CiChecking: Send + Sync {
    fn is_ci(&self) -> bool;
}

/// Looks for the variables CI providers set.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCiChecker;

const CI_VARIABLES: &[&str] = &[
    "CI",
    "BUILD_NUMBER",
    "BUILDKITE",
    "CIRCLECI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "TRAVIS",
    "BITRISE_IO",
    "TEAMCITY_VERSION",
    "XCS",
];

impl EnvCiChecker {
    pub fn is_ci_with(lookup: impl Fn(&str) -> Option<String>) -> bool {
        CI_VARIABLES.iter().any(|name| {
            lookup(name).is_some_and(|value| {
                let value = value.trim().to_ascii_lowercase();
                !value.is_empty() && value != "0" && value != "false"
            })
        })
    }
}

impl CiChecking for EnvCiChecker {
    fn is_ci(&self) -> bool {
        Self::is_ci_with(|name| std::env::var(name).ok())
    }
}

/// Fixed answer, for tests and for `--ci` style overrides.
#[derive(Debug, Clone, Copy)]
pub struct StaticCiChecker(pub bool);

impl CiChecking for StaticCiChecker {
    fn is_ci(&self) -> bool {
        self.0
    }
}

#[derive(Clone)]
pub struct Context {
    pub file_handler: Arc<dyn FileHandling>,
    pub clock: Arc<dyn Clock>,
    pub ci: Arc<dyn CiChecking>,
}

impl Context {
    pub fn new(
        file_handler: Arc<dyn FileHandling>,
        clock: Arc<dyn Clock>,
        ci: Arc<dyn CiChecking>,
    ) -> Self {
        Context {
            file_handler,
            clock,
            ci,
        }
    }

    /// Real file system, wall clock, environment-based CI detection.
    pub fn system() -> Self {
        Context::new(
            Arc::new(FileHandler),
            Arc::new(SystemClock),
            Arc::new(EnvCiChecker),
        )
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("is_ci", &self.ci.is_ci())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ci_detection_reads_provider_variables() {
        assert!(EnvCiChecker::is_ci_with(|name| {
            (name == "GITHUB_ACTIONS").then(|| "true".to_string())
        }));
        assert!(!EnvCiChecker::is_ci_with(|name| {
            (name == "CI").then(|| "false".to_string())
        }));
        assert!(!EnvCiChecker::is_ci_with(|_| None));
    }
}
