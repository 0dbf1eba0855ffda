//! Content hash of a single target

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use tuist_graph::{GraphTarget, TargetDependency};

use crate::content_hasher::{ContentHasher, ContentHashing};
use crate::error::HasherError;

/// Hashes already computed, keyed by `(project path, target name)`.
pub type HashedTargets = HashMap<(PathBuf, String), String>;

#[derive(Clone)]
pub struct TargetContentHasher {
    hasher: ContentHasher,
}

impl TargetContentHasher {
    pub fn new(hasher: ContentHasher) -> Self {
        TargetContentHasher { hasher }
    }

    /// Combines the target's identity, sources, resources, settings and
    /// dependency hashes with `additional_strings`.
    ///
    /// Target dependencies must already be in `hashed_targets`.
    pub fn content_hash(
        &self,
        graph_target: &GraphTarget,
        hashed_targets: &HashedTargets,
        additional_strings: &[String],
    ) -> Result<String, HasherError> {
        let target = &graph_target.target;
        let sources = self.hash_globs(&graph_target.path, &target.sources)?;
        let resources = self.hash_globs(&graph_target.path, &target.resources)?;
        let settings = self.hasher.hash_strings(
            &target
                .settings
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>(),
        );

        let mut dependencies = target
            .dependencies
            .iter()
            .map(|dep| self.dependency_hash(&graph_target.path, dep, hashed_targets))
            .collect::<Result<Vec<_>, _>>()?;
        dependencies.sort();
        let dependencies = self.hasher.hash_strings(&dependencies);

        let mut components = vec![
            target.name.clone(),
            target.platform.to_string(),
            target.product.to_string(),
            target.bundle_id.clone(),
            sources,
            resources,
            settings,
            dependencies,
        ];
        components.extend(additional_strings.iter().cloned());
        Ok(self.hasher.hash_strings(&components))
    }

    fn dependency_hash(
        &self,
        path: &Path,
        dependency: &TargetDependency,
        hashed_targets: &HashedTargets,
    ) -> Result<String, HasherError> {
        let target_hash = |path: &Path, name: &str| {
            hashed_targets
                .get(&(path.to_path_buf(), name.to_string()))
                .cloned()
                .ok_or_else(|| HasherError::MissingTargetHash {
                    name: name.to_string(),
                    path: path.to_path_buf(),
                })
        };
        match dependency {
            TargetDependency::Target { name } => target_hash(path, name),
            TargetDependency::Project { target, path } => target_hash(path, target),
            TargetDependency::Framework { path } | TargetDependency::XCFramework { path } => {
                self.hasher.hash_path(path)
            }
            TargetDependency::Library { path, .. } => self.hasher.hash_path(path),
            TargetDependency::Sdk { name, status } => Ok(format!("sdk-{name}-{status}")),
            TargetDependency::Package { product } => Ok(product.clone()),
            TargetDependency::Cocoapods { path } => Ok(path.to_string_lossy().into_owned()),
            TargetDependency::Xctest => Ok("xctest".to_string()),
        }
    }

    /// Hash of every file matched by the globs, in relative path order.
    /// Files are read in parallel.
    fn hash_globs(&self, root: &Path, patterns: &[String]) -> Result<String, HasherError> {
        let file_handler = self.hasher.file_handler();
        let mut files = Vec::new();
        for pattern in patterns {
            files.extend(file_handler.glob(root, pattern)?);
        }
        files.sort();
        files.dedup();

        let entries = files
            .par_iter()
            .map(|file| {
                let relative = file.strip_prefix(root).unwrap_or(file);
                let hash = self.hasher.hash_path(file)?;
                Ok(format!("{}:{hash}", relative.display()))
            })
            .collect::<Result<Vec<_>, HasherError>>()?;
        Ok(self.hasher.hash_strings(&entries))
    }
}
