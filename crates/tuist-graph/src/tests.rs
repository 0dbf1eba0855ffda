//! Unit tests for tuist-graph

use crate::test_utils::*;
use crate::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const ROOT: &str = "/Projects/App";

fn root() -> &'static Path {
    Path::new(ROOT)
}

#[test]
fn test_topological_targets_puts_dependencies_first() {
    let graph = app_b_c_graph(root());
    let order: Vec<String> = graph
        .topological_targets()
        .unwrap()
        .into_iter()
        .map(|t| t.target.name)
        .collect();
    assert_eq!(order, vec!["C", "B", "App", "AppTests"]);
}

#[test]
fn test_topological_ties_break_by_name() {
    let graph = graph_from_targets(
        root(),
        vec![
            target("Zeta", Product::Framework, &[]),
            target("Alpha", Product::Framework, &[]),
            target("Mid", Product::Framework, &["Zeta", "Alpha"]),
        ],
    );
    let order: Vec<String> = graph
        .topological_targets()
        .unwrap()
        .into_iter()
        .map(|t| t.target.name)
        .collect();
    assert_eq!(order, vec!["Alpha", "Zeta", "Mid"]);
}

#[test]
fn test_cycle_is_reported_with_path() {
    let graph = graph_from_targets(
        root(),
        vec![
            target("A", Product::Framework, &["B"]),
            target("B", Product::Framework, &["C"]),
            target("C", Product::Framework, &["A"]),
        ],
    );
    let err = graph.topological_targets().unwrap_err();
    assert_eq!(
        err,
        GraphError::Cycle(vec!["A".into(), "B".into(), "C".into(), "A".into()])
    );
    assert_eq!(err.severity(), Severity::Abort);
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let graph = graph_from_targets(root(), vec![target("A", Product::Framework, &["A"])]);
    assert_eq!(
        graph.topological_targets().unwrap_err(),
        GraphError::Cycle(vec!["A".into(), "A".into()])
    );
}

#[test]
fn test_transitive_closure_and_linked_binaries() {
    let graph = app_b_c_graph(root());
    let closure = graph.transitive_closure(&GraphDependency::target("App", ROOT));
    assert_eq!(
        closure,
        BTreeSet::from([
            GraphDependency::target("B", ROOT),
            GraphDependency::target("C", ROOT),
        ])
    );
    assert_eq!(
        graph.linked_binaries(root(), "App"),
        BTreeSet::from(["B".to_string(), "C".to_string()])
    );
}

#[test]
fn test_linked_binaries_are_representation_agnostic() {
    let mut graph = app_b_c_graph(root());
    let binary = framework_node("/cache/B.framework");
    graph.dependencies.insert(
        GraphDependency::target("App", ROOT),
        BTreeSet::from([binary.clone()]),
    );
    graph
        .dependencies
        .insert(binary, BTreeSet::from([framework_node("/cache/C.framework")]));
    assert_eq!(
        graph.linked_binaries(root(), "App"),
        BTreeSet::from(["B".to_string(), "C".to_string()])
    );
}

#[test]
fn test_linked_binaries_include_sdks() {
    let mut graph = app_b_c_graph(root());
    let uikit = GraphDependency::Sdk {
        name: "UIKit.framework".into(),
        path: PathBuf::from("/System/Library/Frameworks/UIKit.framework"),
        status: SdkStatus::Required,
        source: SdkSource::System,
    };
    assert!(uikit.is_linked_dynamically());
    graph
        .dependencies
        .entry(GraphDependency::target("C", ROOT))
        .or_default()
        .insert(uikit);
    assert_eq!(
        graph.linked_binaries(root(), "App"),
        BTreeSet::from([
            "B".to_string(),
            "C".to_string(),
            "UIKit.framework".to_string()
        ])
    );
}

#[test]
fn test_traversal_is_idempotent() {
    let graph = app_b_c_graph(root());
    let node = GraphDependency::target("App", ROOT);
    assert_eq!(graph.transitive_closure(&node), graph.transitive_closure(&node));
    assert_eq!(
        graph.topological_targets().unwrap(),
        graph.topological_targets().unwrap()
    );
}

#[test]
fn test_test_targets_depending_on() {
    let graph = app_b_c_graph(root());
    let tests = graph.test_targets_depending_on(root(), "App");
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].name(), "AppTests");
    assert!(graph.test_targets_depending_on(root(), "B").is_empty());
    assert!(graph
        .test_targets_depending_on(Path::new("/elsewhere"), "App")
        .is_empty());
}

#[test]
fn test_all_targets_sorted() {
    let graph = app_b_c_graph(root());
    let names: Vec<String> = graph
        .all_targets()
        .into_iter()
        .map(|t| t.target.name)
        .collect();
    assert_eq!(names, vec!["App", "AppTests", "B", "C"]);
    assert!(graph.target(root(), "Missing").is_none());
}

#[test]
fn test_dot_export() {
    let graph = graph_from_targets(
        root(),
        vec![
            target("App", Product::App, &["B"]),
            target("B", Product::Framework, &[]),
        ],
    );
    insta::assert_snapshot!(graph.to_dot(), @r##"
    digraph "Workspace" {
      "App" [shape=box, style=filled, fillcolor="#d8e8ff"];
      "B" [shape=box, style=filled, fillcolor="#d8e8ff"];
      "App" -> "B";
    }
    "##);
}

#[test]
fn test_dependency_serializes_with_kind_tag() {
    let node = GraphDependency::target("App", ROOT);
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["kind"], "target");
    assert_eq!(json["name"], "App");

    let back: GraphDependency = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_manifest_dependency_resolution() {
    let dep = TargetDependency::Framework {
        path: PathBuf::from("Vendor/A.framework"),
    };
    assert_eq!(
        dep.resolved(root()),
        TargetDependency::Framework {
            path: PathBuf::from("/Projects/App/Vendor/A.framework")
        }
    );
}

#[test]
fn test_architecture_names() {
    assert_eq!("arm64_32".parse::<BinaryArchitecture>().unwrap(), BinaryArchitecture::Arm6432);
    assert_eq!(BinaryArchitecture::X8664.to_string(), "x86_64");
    assert!("ppc".parse::<BinaryArchitecture>().is_err());
}
