//! Value graph: projects, targets and the dependency adjacency map

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dependency::GraphDependency;
use crate::error::GraphError;
use crate::model::{GraphTarget, Package, Project, Target, Workspace};

/// An immutable snapshot of a loaded workspace.
///
/// Mappers never edit a graph in place; they build a new one from the parts
/// of the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueGraph {
    pub name: String,
    pub path: PathBuf,
    pub workspace: Workspace,
    pub projects: BTreeMap<PathBuf, Project>,
    /// Packages by declaring project path, then by package name.
    pub packages: BTreeMap<PathBuf, BTreeMap<String, Package>>,
    /// Targets by declaring project path, then by target name.
    pub targets: BTreeMap<PathBuf, BTreeMap<String, Target>>,
    pub dependencies: BTreeMap<GraphDependency, BTreeSet<GraphDependency>>,
}

impl ValueGraph {
    pub fn new(workspace: Workspace) -> Self {
        ValueGraph {
            name: workspace.name.clone(),
            path: workspace.path.clone(),
            workspace,
            projects: BTreeMap::new(),
            packages: BTreeMap::new(),
            targets: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn target(&self, path: &Path, name: &str) -> Option<GraphTarget> {
        self.targets
            .get(path)
            .and_then(|targets| targets.get(name))
            .map(|target| GraphTarget::new(path, target.clone()))
    }

    /// Every target, sorted by project path then name.
    pub fn all_targets(&self) -> Vec<GraphTarget> {
        self.targets
            .iter()
            .flat_map(|(path, targets)| {
                targets
                    .values()
                    .map(move |target| GraphTarget::new(path.clone(), target.clone()))
            })
            .collect()
    }

    pub fn target_count(&self) -> usize {
        self.targets.values().map(BTreeMap::len).sum()
    }

    pub fn direct_dependencies(&self, dependency: &GraphDependency) -> BTreeSet<&GraphDependency> {
        self.dependencies
            .get(dependency)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Targets the given target depends on directly, across projects.
    pub fn direct_target_dependencies(&self, path: &Path, name: &str) -> Vec<GraphTarget> {
        let node = GraphDependency::target(name, path);
        self.direct_dependencies(&node)
            .into_iter()
            .filter_map(|dep| dep.target_reference())
            .filter_map(|(path, name)| self.target(path, name))
            .collect()
    }

    /// Test targets in the same project that depend directly on the target.
    pub fn test_targets_depending_on(&self, path: &Path, name: &str) -> Vec<GraphTarget> {
        let node = GraphDependency::target(name, path);
        let Some(targets) = self.targets.get(path) else {
            return Vec::new();
        };
        targets
            .values()
            .filter(|target| target.product.is_test())
            .filter(|target| {
                self.dependencies
                    .get(&GraphDependency::target(&target.name, path))
                    .is_some_and(|deps| deps.contains(&node))
            })
            .map(|target| GraphTarget::new(path, target.clone()))
            .collect()
    }

    /// Every node reachable from `dependency`, not including itself.
    pub fn transitive_closure(&self, dependency: &GraphDependency) -> BTreeSet<GraphDependency> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<&GraphDependency> =
            self.direct_dependencies(dependency).into_iter().collect();
        while let Some(current) = stack.pop() {
            if visited.insert(current.clone()) {
                stack.extend(self.direct_dependencies(current));
            }
        }
        visited
    }

    /// Names of everything a target ends up linking, whether it's built from
    /// source or consumed as a binary. `B` and `B.framework` both read `B`;
    /// SDKs keep their full name, `UIKit.framework`.
    pub fn linked_binaries(&self, path: &Path, name: &str) -> BTreeSet<String> {
        self.transitive_closure(&GraphDependency::target(name, path))
            .into_iter()
            .filter(|dep| {
                dep.is_target()
                    || dep.is_precompiled()
                    || matches!(dep, GraphDependency::Sdk { .. })
            })
            .map(|dep| artifact_name(&dep))
            .collect()
    }

    /// Targets ordered so each one comes after all of its target dependencies.
    ///
    /// Ties are broken by name, then path, so the order is the same on every run.
    pub fn topological_targets(&self) -> Result<Vec<GraphTarget>, GraphError> {
        let mut detector = CycleDetector::default();
        for (path, targets) in &self.targets {
            for name in targets.keys() {
                detector.add_node(path, name);
            }
        }
        for (from, deps) in &self.dependencies {
            let Some((from_path, from_name)) = from.target_reference() else {
                continue;
            };
            for (to_path, to_name) in deps.iter().filter_map(|d| d.target_reference()) {
                if self.target(to_path, to_name).is_some() {
                    detector.add_edge(from_path, from_name, to_path, to_name);
                }
            }
        }
        detector.check()?;

        // Kahn's algorithm over "number of unresolved target dependencies".
        let mut pending: BTreeMap<(String, PathBuf), usize> = BTreeMap::new();
        let mut dependents: HashMap<(String, PathBuf), Vec<(String, PathBuf)>> = HashMap::new();
        for target in self.all_targets() {
            let key = (target.target.name.clone(), target.path.clone());
            let deps = self.direct_target_dependencies(&target.path, &target.target.name);
            pending.insert(key.clone(), deps.len());
            for dep in deps {
                dependents
                    .entry((dep.target.name, dep.path))
                    .or_default()
                    .push(key.clone());
            }
        }

        let mut ready: BTreeSet<(String, PathBuf)> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(key, _)| key.clone())
            .collect();
        let mut ordered = Vec::with_capacity(pending.len());
        while let Some(key) = ready.pop_first() {
            for dependent in dependents.get(&key).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.clone());
                    }
                }
            }
            let (name, path) = key;
            if let Some(target) = self.target(&path, &name) {
                ordered.push(target);
            }
        }
        Ok(ordered)
    }
}

/// `B.framework`, `B.xcframework` and `libB.a` all name the artifact `B`.
fn artifact_name(dependency: &GraphDependency) -> String {
    match dependency {
        GraphDependency::Target { name, .. } | GraphDependency::Sdk { name, .. } => name.clone(),
        GraphDependency::Library { path, .. } => path
            .file_stem()
            .map(|s| s.to_string_lossy().trim_start_matches("lib").to_string())
            .unwrap_or_default(),
        _ => dependency
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

/// Collects target edges and reports the first circular dependency found.
#[derive(Debug, Default)]
pub struct CycleDetector {
    graph: DiGraph<(PathBuf, String), ()>,
    indices: HashMap<(PathBuf, String), NodeIndex>,
}

impl CycleDetector {
    pub fn add_node(&mut self, path: &Path, name: &str) -> NodeIndex {
        let key = (path.to_path_buf(), name.to_string());
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        let index = self.graph.add_node(key.clone());
        self.indices.insert(key, index);
        index
    }

    pub fn add_edge(&mut self, from_path: &Path, from: &str, to_path: &Path, to: &str) {
        let a = self.add_node(from_path, from);
        let b = self.add_node(to_path, to);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Fails with the names along one cycle, first name repeated at the end.
    pub fn check(&self) -> Result<(), GraphError> {
        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();
        if components.is_empty() {
            return Ok(());
        }
        // Report the same cycle every time.
        for scc in &mut components {
            scc.sort_by(|a, b| {
                let (a, b) = (&self.graph[*a], &self.graph[*b]);
                a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))
            });
        }
        components.sort_by(|a, b| self.graph[a[0]].1.cmp(&self.graph[b[0]].1));

        let scc = &components[0];
        let path = self.cycle_through(scc[0], scc);
        Err(GraphError::Cycle(
            path.into_iter().map(|i| self.graph[i].1.clone()).collect(),
        ))
    }

    /// Depth-first search inside one strongly connected component back to `start`.
    fn cycle_through(&self, start: NodeIndex, scc: &[NodeIndex]) -> Vec<NodeIndex> {
        let mut path = vec![start];
        let mut visited = vec![start];
        if self.search(start, start, scc, &mut path, &mut visited) {
            path
        } else {
            vec![start, start]
        }
    }

    fn search(
        &self,
        current: NodeIndex,
        start: NodeIndex,
        scc: &[NodeIndex],
        path: &mut Vec<NodeIndex>,
        visited: &mut Vec<NodeIndex>,
    ) -> bool {
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors(current)
            .filter(|n| scc.contains(n))
            .collect();
        next.sort_by(|a, b| self.graph[*a].1.cmp(&self.graph[*b].1));
        for neighbor in next {
            if neighbor == start {
                path.push(start);
                return true;
            }
            if visited.contains(&neighbor) {
                continue;
            }
            visited.push(neighbor);
            path.push(neighbor);
            if self.search(neighbor, start, scc, path, visited) {
                return true;
            }
            path.pop();
        }
        false
    }
}
