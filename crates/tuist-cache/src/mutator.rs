//! Swaps targets for the binaries the cache holds for them

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{Context, GraphDependency, GraphTarget, ValueGraph};
use tuist_loader::{BinaryInspecting, FrameworkLoader, MachOInspector, XCFrameworkLoader};

use crate::error::CacheError;

type TargetKey = (PathBuf, String);

#[derive(Clone)]
pub struct CacheGraphMutator {
    frameworks: FrameworkLoader,
    xcframeworks: XCFrameworkLoader,
}

impl CacheGraphMutator {
    pub fn new(frameworks: FrameworkLoader, xcframeworks: XCFrameworkLoader) -> Self {
        CacheGraphMutator {
            frameworks,
            xcframeworks,
        }
    }

    pub fn from_context(context: &Context) -> Self {
        let inspector: Arc<dyn BinaryInspecting> =
            Arc::new(MachOInspector::new(context.file_handler.clone()));
        CacheGraphMutator::new(
            FrameworkLoader::new(context.file_handler.clone(), inspector.clone()),
            XCFrameworkLoader::new(context.file_handler.clone(), inspector),
        )
    }

    /// Returns a copy of `graph` where every target that can come from the
    /// cache is replaced by the bundle at its `precompiled` path.
    ///
    /// A target can be replaced when it has a bundle, isn't named in
    /// `sources`, and every target it depends on can be replaced too. Whatever
    /// depended on it points at the binary instead, and the binary carries the
    /// frameworks and SDKs the target linked. Targets no longer built from source
    /// are kept with `prune` set.
    pub fn map(
        &self,
        graph: &ValueGraph,
        precompiled: &BTreeMap<GraphTarget, PathBuf>,
        sources: &BTreeSet<String>,
    ) -> Result<ValueGraph, CacheError> {
        let mut mutation = Mutation {
            mutator: self,
            graph,
            precompiled: precompiled
                .iter()
                .map(|(target, path)| {
                    let key = (target.path.clone(), target.target.name.clone());
                    (key, path.clone())
                })
                .collect(),
            sources,
            cache_paths: HashMap::new(),
            loaded: HashMap::new(),
            source_targets: BTreeSet::new(),
            visited_binaries: BTreeSet::new(),
            dependencies: BTreeMap::new(),
        };

        let mut roots = BTreeSet::new();
        for target in graph.all_targets() {
            if sources.contains(target.name()) {
                roots.extend(graph.test_targets_depending_on(&target.path, target.name()));
                roots.insert(target);
            } else if mutation.cache_path(&target.path, target.name()).is_none() {
                roots.insert(target);
            }
        }
        for root in &roots {
            mutation.visit_source(&GraphDependency::target(root.name(), &root.path))?;
        }

        // Precompiled nodes that were already in the graph keep their edges.
        let mut dependencies = mutation.dependencies;
        for (node, deps) in &graph.dependencies {
            if !node.is_target() {
                dependencies
                    .entry(node.clone())
                    .or_insert_with(|| deps.clone());
            }
        }

        let mut mapped = graph.clone();
        mapped.dependencies = dependencies;
        let mut pruned = 0;
        for (path, targets) in mapped.targets.iter_mut() {
            for (name, target) in targets.iter_mut() {
                if !mutation
                    .source_targets
                    .contains(&(path.clone(), name.clone()))
                {
                    target.prune = true;
                    pruned += 1;
                }
            }
        }
        tracing::info!(
            "Replaced {} of {} targets with cached binaries",
            pruned,
            graph.target_count()
        );
        Ok(mapped)
    }

    /// Loads a cached bundle with the loader its extension calls for.
    fn load(&self, path: &Path) -> Result<GraphDependency, CacheError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("framework") => Ok(self.frameworks.load(path)?),
            Some("xcframework") => Ok(self.xcframeworks.load(path)?),
            _ => match self.frameworks.load(path) {
                Ok(framework) => Ok(framework),
                Err(e) => {
                    tracing::debug!(
                        "{} is not a framework ({}), trying xcframework",
                        path.display(),
                        e
                    );
                    Ok(self.xcframeworks.load(path)?)
                }
            },
        }
    }
}

/// State of one `map` call.
struct Mutation<'a> {
    mutator: &'a CacheGraphMutator,
    graph: &'a ValueGraph,
    precompiled: HashMap<TargetKey, PathBuf>,
    sources: &'a BTreeSet<String>,
    /// `None` once a target is known not to be replaceable.
    cache_paths: HashMap<TargetKey, Option<PathBuf>>,
    loaded: HashMap<PathBuf, GraphDependency>,
    source_targets: BTreeSet<TargetKey>,
    visited_binaries: BTreeSet<GraphDependency>,
    dependencies: BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
}

impl Mutation<'_> {
    /// The bundle that replaces the target, if it can be replaced.
    fn cache_path(&mut self, path: &Path, name: &str) -> Option<PathBuf> {
        let key = (path.to_path_buf(), name.to_string());
        if let Some(visited) = self.cache_paths.get(&key) {
            return visited.clone();
        }
        // Provisional answer in case the graph loops back here.
        self.cache_paths.insert(key.clone(), None);

        let candidate = self
            .precompiled
            .get(&key)
            .filter(|_| !self.sources.contains(name))
            .cloned();
        let cache_path = candidate.filter(|_| {
            let graph = self.graph;
            graph
                .direct_target_dependencies(path, name)
                .iter()
                .all(|dep| self.cache_path(&dep.path, dep.name()).is_some())
        });
        self.cache_paths.insert(key, cache_path.clone());
        cache_path
    }

    fn load(&mut self, path: &Path) -> Result<GraphDependency, CacheError> {
        if let Some(loaded) = self.loaded.get(path) {
            return Ok(loaded.clone());
        }
        let loaded = self.mutator.load(path)?;
        self.loaded.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Keeps the target as source and maps its dependencies.
    fn visit_source(&mut self, node: &GraphDependency) -> Result<(), CacheError> {
        let Some((path, name)) = node.target_reference() else {
            return Ok(());
        };
        if !self
            .source_targets
            .insert((path.to_path_buf(), name.to_string()))
        {
            return Ok(());
        }
        let graph = self.graph;
        if let Some(deps) = graph.dependencies.get(node) {
            let mapped = self.map_dependencies(deps)?;
            self.dependencies.insert(node.clone(), mapped);
        }
        Ok(())
    }

    /// Gives the binary that replaced `node` the frameworks and SDKs `node`
    /// depended on. Static ones are linked into it already.
    fn visit_binary(
        &mut self,
        node: &GraphDependency,
        binary: &GraphDependency,
    ) -> Result<(), CacheError> {
        if !self.visited_binaries.insert(binary.clone()) {
            return Ok(());
        }
        let graph = self.graph;
        let Some(deps) = graph.dependencies.get(node) else {
            return Ok(());
        };
        let inherited: BTreeSet<GraphDependency> = self
            .map_dependencies(deps)?
            .into_iter()
            .filter(GraphDependency::is_linked_dynamically)
            .collect();
        if !inherited.is_empty() {
            self.dependencies
                .entry(binary.clone())
                .or_default()
                .extend(inherited);
        }
        Ok(())
    }

    fn map_dependencies(
        &mut self,
        deps: &BTreeSet<GraphDependency>,
    ) -> Result<BTreeSet<GraphDependency>, CacheError> {
        let mut mapped = BTreeSet::new();
        for dep in deps {
            let Some((path, name)) = dep.target_reference() else {
                mapped.insert(dep.clone());
                continue;
            };
            if self.graph.target(path, name).is_none() {
                continue;
            }
            match self.cache_path(path, name) {
                Some(cache_path) => {
                    let binary = self.load(&cache_path)?;
                    self.visit_binary(dep, &binary)?;
                    mapped.insert(binary);
                }
                None => {
                    self.visit_source(dep)?;
                    mapped.insert(dep.clone());
                }
            }
        }
        Ok(mapped)
    }
}
