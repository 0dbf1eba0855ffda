//! Assembles projects into a [`ValueGraph`]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{
    Context, CycleDetector, GraphDependency, GraphError, Package, Project, Target,
    TargetDependency, ValueGraph, Workspace,
};

use crate::error::LoaderError;
use crate::framework::FrameworkLoader;
use crate::library::LibraryLoader;
use crate::metadata::{BinaryInspecting, MachOInspector};
use crate::sdk::SystemFrameworkLoader;
use crate::xcframework::XCFrameworkLoader;

/// Turns loaded projects into a graph, visiting every target once.
#[derive(Clone)]
pub struct GraphLoader {
    frameworks: FrameworkLoader,
    libraries: LibraryLoader,
    xcframeworks: XCFrameworkLoader,
    sdks: SystemFrameworkLoader,
}

impl GraphLoader {
    pub fn new(
        frameworks: FrameworkLoader,
        libraries: LibraryLoader,
        xcframeworks: XCFrameworkLoader,
        sdks: SystemFrameworkLoader,
    ) -> Self {
        GraphLoader {
            frameworks,
            libraries,
            xcframeworks,
            sdks,
        }
    }

    /// Loaders backed by the context's file handler and Mach-O inspection.
    pub fn from_context(context: &Context) -> Self {
        let inspector: Arc<dyn BinaryInspecting> =
            Arc::new(MachOInspector::new(context.file_handler.clone()));
        GraphLoader::new(
            FrameworkLoader::new(context.file_handler.clone(), inspector.clone()),
            LibraryLoader::new(context.file_handler.clone(), inspector.clone()),
            XCFrameworkLoader::new(context.file_handler.clone(), inspector),
            SystemFrameworkLoader::default(),
        )
    }

    /// Loads every project of the workspace and whatever they reference.
    ///
    /// The resulting workspace lists the projects that were actually reached.
    pub fn load_workspace(
        &self,
        workspace: &Workspace,
        projects: &[Project],
    ) -> Result<ValueGraph, LoaderError> {
        let mut cache = LoadCache::new(projects);
        for path in &workspace.projects {
            self.load_project_at(path, &mut cache)?;
        }
        cache.cycles.check()?;

        let workspace =
            workspace.replacing_projects(cache.loaded_projects.keys().cloned().collect());
        tracing::info!(
            "Loaded graph for {} ({} projects, {} targets)",
            workspace.name,
            cache.loaded_projects.len(),
            cache.loaded_targets.values().map(BTreeMap::len).sum::<usize>()
        );
        Ok(cache.into_graph(workspace))
    }

    /// Loads the project at `path` as the root of a graph.
    pub fn load_project(
        &self,
        path: &Path,
        projects: &[Project],
    ) -> Result<(Project, ValueGraph), LoaderError> {
        let mut cache = LoadCache::new(projects);
        let root = cache
            .all_projects
            .get(path)
            .cloned()
            .ok_or_else(|| GraphError::MissingProject(path.to_path_buf()))?;
        self.load_project_at(path, &mut cache)?;
        cache.cycles.check()?;

        let workspace = Workspace {
            path: path.to_path_buf(),
            name: root.name.clone(),
            projects: cache.loaded_projects.keys().cloned().collect(),
        };
        Ok((root, cache.into_graph(workspace)))
    }

    fn load_project_at(&self, path: &Path, cache: &mut LoadCache) -> Result<(), LoaderError> {
        if cache.loaded_projects.contains_key(path) {
            return Ok(());
        }
        let project = cache
            .all_projects
            .get(path)
            .cloned()
            .ok_or_else(|| GraphError::MissingProject(path.to_path_buf()))?;
        cache.add_project(&project);
        for target in &project.targets {
            self.load_target(path, &target.name, cache)?;
        }
        Ok(())
    }

    fn load_target(&self, path: &Path, name: &str, cache: &mut LoadCache) -> Result<(), LoaderError> {
        if cache.target_loaded(path, name) {
            return Ok(());
        }
        if !cache.all_projects.contains_key(path) {
            return Err(GraphError::MissingProject(path.to_path_buf()).into());
        }
        let target = cache
            .all_projects
            .get(path)
            .and_then(|project| project.targets.iter().find(|t| t.name == name))
            .cloned()
            .ok_or_else(|| GraphError::TargetNotFound(name.to_string(), path.to_path_buf()))?;

        cache
            .loaded_targets
            .entry(path.to_path_buf())
            .or_default()
            .insert(target.name.clone(), target.clone());
        cache.cycles.add_node(path, name);

        let mut dependencies = BTreeSet::new();
        for dependency in &target.dependencies {
            dependencies.insert(self.load_dependency(path, &target, dependency, cache)?);
        }
        if !dependencies.is_empty() {
            cache
                .dependencies
                .insert(GraphDependency::target(name, path), dependencies);
        }
        Ok(())
    }

    fn load_dependency(
        &self,
        path: &Path,
        from: &Target,
        dependency: &TargetDependency,
        cache: &mut LoadCache,
    ) -> Result<GraphDependency, LoaderError> {
        match dependency {
            TargetDependency::Target { name } => {
                cache.cycles.add_edge(path, &from.name, path, name);
                self.load_target(path, name, cache)?;
                Ok(GraphDependency::target(name, path))
            }
            TargetDependency::Project {
                target,
                path: project_path,
            } => {
                cache.cycles.add_edge(path, &from.name, project_path, target);
                self.load_project_at(project_path, cache)?;
                self.load_target(project_path, target, cache)?;
                Ok(GraphDependency::target(target, project_path))
            }
            TargetDependency::Framework { path } => {
                cached(&mut cache.frameworks, path, || self.frameworks.load(path))
            }
            TargetDependency::Library {
                path,
                public_headers,
                swift_module_map,
            } => cached(&mut cache.libraries, path, || {
                self.libraries
                    .load(path, public_headers, swift_module_map.as_deref())
            }),
            TargetDependency::XCFramework { path } => {
                cached(&mut cache.xcframeworks, path, || self.xcframeworks.load(path))
            }
            TargetDependency::Sdk { name, status } => Ok(self.sdks.load(name, *status)?),
            TargetDependency::Package { product } => Ok(GraphDependency::PackageProduct {
                path: path.to_path_buf(),
                product: product.clone(),
            }),
            TargetDependency::Cocoapods { path } => {
                Ok(GraphDependency::Cocoapods { path: path.clone() })
            }
            TargetDependency::Xctest => Ok(self.sdks.load_xctest(from.platform)),
        }
    }
}

/// Precompiled artifacts are loaded once per path.
fn cached(
    loaded: &mut HashMap<PathBuf, GraphDependency>,
    path: &Path,
    load: impl FnOnce() -> Result<GraphDependency, LoaderError>,
) -> Result<GraphDependency, LoaderError> {
    if let Some(dependency) = loaded.get(path) {
        return Ok(dependency.clone());
    }
    let dependency = load()?;
    loaded.insert(path.to_path_buf(), dependency.clone());
    Ok(dependency)
}

struct LoadCache {
    all_projects: BTreeMap<PathBuf, Project>,
    loaded_projects: BTreeMap<PathBuf, Project>,
    loaded_targets: BTreeMap<PathBuf, BTreeMap<String, Target>>,
    packages: BTreeMap<PathBuf, BTreeMap<String, Package>>,
    dependencies: BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
    frameworks: HashMap<PathBuf, GraphDependency>,
    libraries: HashMap<PathBuf, GraphDependency>,
    xcframeworks: HashMap<PathBuf, GraphDependency>,
    cycles: CycleDetector,
}

impl LoadCache {
    fn new(projects: &[Project]) -> Self {
        LoadCache {
            all_projects: projects
                .iter()
                .map(|p| (p.path.clone(), p.clone()))
                .collect(),
            loaded_projects: BTreeMap::new(),
            loaded_targets: BTreeMap::new(),
            packages: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            frameworks: HashMap::new(),
            libraries: HashMap::new(),
            xcframeworks: HashMap::new(),
            cycles: CycleDetector::default(),
        }
    }

    fn add_project(&mut self, project: &Project) {
        self.loaded_projects
            .insert(project.path.clone(), project.clone());
        for package in &project.packages {
            self.packages
                .entry(project.path.clone())
                .or_default()
                .insert(package.name(), package.clone());
        }
    }

    fn target_loaded(&self, path: &Path, name: &str) -> bool {
        self.loaded_targets
            .get(path)
            .is_some_and(|targets| targets.contains_key(name))
    }

    fn into_graph(self, workspace: Workspace) -> ValueGraph {
        ValueGraph {
            name: workspace.name.clone(),
            path: workspace.path.clone(),
            workspace,
            projects: self.loaded_projects,
            packages: self.packages,
            targets: self.loaded_targets,
            dependencies: self.dependencies,
        }
    }
}
