//! Fixture builders shared by the workspace's tests

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::dependency::GraphDependency;
use crate::graph::ValueGraph;
use crate::model::{
    BinaryArchitecture, BinaryLinking, Platform, Product, Project, Target, TargetDependency,
    Workspace,
};

/// An iOS target with the given target dependencies.
pub fn target(name: &str, product: Product, deps: &[&str]) -> Target {
    let mut target = Target::new(name, Platform::IOS, product);
    target.sources = vec![format!("{name}/Sources/**/*.swift")];
    target.dependencies = deps
        .iter()
        .map(|dep| TargetDependency::Target {
            name: dep.to_string(),
        })
        .collect();
    target
}

/// Single-project graph; only `TargetDependency::Target` edges are projected.
pub fn graph_from_targets(path: &Path, targets: Vec<Target>) -> ValueGraph {
    let workspace = Workspace {
        path: path.to_path_buf(),
        name: "Workspace".to_string(),
        projects: vec![path.to_path_buf()],
    };
    let mut graph = ValueGraph::new(workspace);
    graph.projects.insert(
        path.to_path_buf(),
        Project {
            path: path.to_path_buf(),
            name: "Project".to_string(),
            targets: targets.clone(),
            packages: Vec::new(),
        },
    );

    let mut by_name = BTreeMap::new();
    for target in targets {
        let node = GraphDependency::target(&target.name, path);
        let deps: BTreeSet<GraphDependency> = target
            .dependencies
            .iter()
            .filter_map(|dep| match dep {
                TargetDependency::Target { name } => Some(GraphDependency::target(name, path)),
                _ => None,
            })
            .collect();
        graph.dependencies.insert(node, deps);
        by_name.insert(target.name.clone(), target);
    }
    graph.targets.insert(path.to_path_buf(), by_name);
    graph
}

/// `App -> B -> C`, all iOS, B and C frameworks, plus `AppTests -> App`.
pub fn app_b_c_graph(path: &Path) -> ValueGraph {
    graph_from_targets(
        path,
        vec![
            target("App", Product::App, &["B"]),
            target("B", Product::Framework, &["C"]),
            target("C", Product::Framework, &[]),
            target("AppTests", Product::UnitTests, &["App"]),
        ],
    )
}

/// A dynamic framework node as a loader would produce it.
pub fn framework_node(path: impl Into<PathBuf>) -> GraphDependency {
    let path = path.into();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    GraphDependency::Framework {
        binary_path: path.join(&name),
        path,
        dsym_path: None,
        bcsymbolmap_paths: Vec::new(),
        linking: BinaryLinking::Dynamic,
        architectures: vec![BinaryArchitecture::Arm64],
        is_carthage: false,
    }
}

/// A temporary directory populated with `(relative path, contents)` pairs.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// Manifests and sources for the `App -> B -> C` workspace on disk.
pub fn create_app_b_c_repo() -> TempDir {
    create_repo_with_structure(&[
        (
            "Workspace.json",
            r#"{ "name": "Workspace", "projects": ["App", "Frameworks"] }"#,
        ),
        (
            "App/Project.json",
            r#"{
  "name": "App",
  "targets": [
    { "name": "App", "platform": "ios", "product": "app",
      "sources": ["Sources/**/*.swift"],
      "dependencies": [{ "type": "project", "target": "B", "path": "../Frameworks" }] },
    { "name": "AppTests", "platform": "ios", "product": "unit_tests",
      "sources": ["Tests/**/*.swift"],
      "dependencies": [{ "type": "target", "name": "App" }] }
  ]
}"#,
        ),
        ("App/Sources/AppDelegate.swift", "import B\n"),
        ("App/Tests/AppTests.swift", "import XCTest\n"),
        (
            "Frameworks/Project.json",
            r#"{
  "name": "Frameworks",
  "targets": [
    { "name": "B", "platform": "ios", "product": "framework",
      "sources": ["B/**/*.swift"],
      "dependencies": [{ "type": "target", "name": "C" }] },
    { "name": "C", "platform": "ios", "product": "framework",
      "sources": ["C/**/*.swift"],
      "dependencies": [{ "type": "sdk", "name": "UIKit.framework" }] }
  ]
}"#,
        ),
        ("Frameworks/B/B.swift", "import C\npublic struct B {}\n"),
        ("Frameworks/C/C.swift", "public struct C {}\n"),
    ])
}
