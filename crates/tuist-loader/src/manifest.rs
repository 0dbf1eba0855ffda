//! Manifest reading and decoding into projects and workspaces

use std::collections::{BTreeMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use tuist_graph::{FileHandling, Package, Project, Target, TargetDependency, Workspace};

use crate::error::LoaderError;

pub const PROJECT_MANIFEST: &str = "Project.json";
pub const WORKSPACE_MANIFEST: &str = "Workspace.json";

/// Produces the raw bytes of a manifest file.
pub trait ManifestLoading: Send + Sync {
    fn load(&self, manifest: &Path) -> Result<Vec<u8>, LoaderError>;
}

/// Reads manifests from disk.
#[derive(Clone)]
pub struct ManifestLoader {
    file_handler: Arc<dyn FileHandling>,
}

impl ManifestLoader {
    pub fn new(file_handler: Arc<dyn FileHandling>) -> Self {
        ManifestLoader { file_handler }
    }
}

impl ManifestLoading for ManifestLoader {
    fn load(&self, manifest: &Path) -> Result<Vec<u8>, LoaderError> {
        if !self.file_handler.exists(manifest) {
            return Err(LoaderError::ManifestNotFound(manifest.to_path_buf()));
        }
        Ok(self.file_handler.read(manifest)?)
    }
}

#[derive(Debug, Deserialize)]
struct ProjectManifest {
    name: String,
    #[serde(default)]
    targets: Vec<Target>,
    #[serde(default)]
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceManifest {
    name: String,
    projects: Vec<PathBuf>,
}

/// Decodes manifests into models with every path made absolute.
#[derive(Clone)]
pub struct ModelLoader {
    manifest_loader: Arc<dyn ManifestLoading>,
}

impl ModelLoader {
    pub fn new(manifest_loader: Arc<dyn ManifestLoading>) -> Self {
        ModelLoader { manifest_loader }
    }

    pub fn load_project(&self, dir: &Path) -> Result<Project, LoaderError> {
        let dir = normalize(dir);
        let manifest_path = dir.join(PROJECT_MANIFEST);
        let bytes = self.manifest_loader.load(&manifest_path)?;
        let manifest: ProjectManifest =
            serde_json::from_slice(&bytes).map_err(|e| LoaderError::ManifestDecode {
                path: manifest_path.clone(),
                reason: e.to_string(),
            })?;

        let targets = manifest
            .targets
            .into_iter()
            .map(|mut target| {
                target.dependencies = target
                    .dependencies
                    .into_iter()
                    .map(|dep| normalize_dependency(dep.resolved(&dir)))
                    .collect();
                if target.bundle_id.is_empty() {
                    target.bundle_id = format!("io.tuist.{}", target.name);
                }
                target
            })
            .collect();
        let packages = manifest
            .packages
            .into_iter()
            .map(|package| match package {
                Package::Local { path } => Package::Local {
                    path: normalize(&dir.join(path)),
                },
                remote @ Package::Remote { .. } => remote,
            })
            .collect();

        Ok(Project {
            path: dir,
            name: manifest.name,
            targets,
            packages,
        })
    }

    /// Loads the workspace at `dir` and every project it reaches.
    ///
    /// A directory with only a project manifest becomes a workspace of one.
    pub fn load_workspace(&self, dir: &Path) -> Result<(Workspace, Vec<Project>), LoaderError> {
        let dir = normalize(dir);
        let manifest_path = dir.join(WORKSPACE_MANIFEST);
        let workspace = match self.manifest_loader.load(&manifest_path) {
            Ok(bytes) => {
                let manifest: WorkspaceManifest = serde_json::from_slice(&bytes).map_err(|e| {
                    LoaderError::ManifestDecode {
                        path: manifest_path.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Workspace {
                    path: dir.clone(),
                    name: manifest.name,
                    projects: manifest
                        .projects
                        .iter()
                        .map(|p| normalize(&dir.join(p)))
                        .collect(),
                }
            }
            Err(LoaderError::ManifestNotFound(_)) => {
                let project = self.load_project(&dir)?;
                Workspace {
                    path: dir.clone(),
                    name: project.name,
                    projects: vec![dir.clone()],
                }
            }
            Err(e) => return Err(e),
        };

        let projects = self.load_projects(&workspace.projects)?;
        Ok((workspace, projects))
    }

    /// Follows `Project` dependencies until every referenced project is loaded.
    pub fn load_projects(&self, roots: &[PathBuf]) -> Result<Vec<Project>, LoaderError> {
        let mut loaded: BTreeMap<PathBuf, Project> = BTreeMap::new();
        let mut queue: VecDeque<PathBuf> = roots.iter().cloned().collect();
        while let Some(path) = queue.pop_front() {
            if loaded.contains_key(&path) {
                continue;
            }
            let project = self.load_project(&path)?;
            for target in &project.targets {
                for dep in &target.dependencies {
                    if let TargetDependency::Project { path, .. } = dep {
                        if !loaded.contains_key(path) {
                            queue.push_back(path.clone());
                        }
                    }
                }
            }
            tracing::debug!("Loaded manifest for project {}", project.name);
            loaded.insert(path, project);
        }
        Ok(loaded.into_values().collect())
    }
}

fn normalize_dependency(dependency: TargetDependency) -> TargetDependency {
    match dependency {
        TargetDependency::Project { target, path } => TargetDependency::Project {
            target,
            path: normalize(&path),
        },
        TargetDependency::Framework { path } => TargetDependency::Framework {
            path: normalize(&path),
        },
        TargetDependency::Library {
            path,
            public_headers,
            swift_module_map,
        } => TargetDependency::Library {
            path: normalize(&path),
            public_headers: normalize(&public_headers),
            swift_module_map: swift_module_map.as_deref().map(normalize),
        },
        TargetDependency::XCFramework { path } => TargetDependency::XCFramework {
            path: normalize(&path),
        },
        TargetDependency::Cocoapods { path } => TargetDependency::Cocoapods {
            path: normalize(&path),
        },
        other => other,
    }
}

/// Removes `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
