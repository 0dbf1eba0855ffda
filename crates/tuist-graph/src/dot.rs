//! Graphviz export

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::dependency::GraphDependency;
use crate::graph::ValueGraph;

fn style(dependency: &GraphDependency) -> &'static str {
    match dependency {
        GraphDependency::Target { .. } => "shape=box, style=filled, fillcolor=\"#d8e8ff\"",
        GraphDependency::Framework { .. } => "shape=box3d, style=filled, fillcolor=\"#fdf2c4\"",
        GraphDependency::XCFramework { .. } => "shape=box3d, style=filled, fillcolor=\"#fbe0b5\"",
        GraphDependency::Library { .. } => "shape=folder",
        GraphDependency::PackageProduct { .. } => "shape=tab",
        GraphDependency::Sdk { .. } => "shape=ellipse, style=dashed",
        GraphDependency::Cocoapods { .. } => "shape=cylinder",
    }
}

impl ValueGraph {
    /// Renders the dependency graph in the DOT language.
    pub fn to_dot(&self) -> String {
        let mut nodes: BTreeSet<GraphDependency> = self
            .all_targets()
            .into_iter()
            .map(|t| GraphDependency::target(t.target.name, t.path))
            .collect();
        for (from, deps) in &self.dependencies {
            nodes.insert(from.clone());
            nodes.extend(deps.iter().cloned());
        }

        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape(&self.name));
        for node in &nodes {
            let _ = writeln!(out, "  \"{}\" [{}];", escape(&node.name()), style(node));
        }
        for (from, deps) in &self.dependencies {
            for to in deps {
                let _ = writeln!(
                    out,
                    "  \"{}\" -> \"{}\";",
                    escape(&from.name()),
                    escape(&to.name())
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
