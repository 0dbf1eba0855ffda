//! Validates source and resource globs before the graph is assembled

use tuist_graph::fs::glob_base;
use tuist_graph::{FileHandling, Project};

use crate::error::{InvalidGlob, LoaderError};

/// Checks every glob of every target and reports all failures at once.
pub fn lint_globs(projects: &[Project], file_handler: &dyn FileHandling) -> Result<(), LoaderError> {
    let mut invalid = Vec::new();
    for project in projects {
        for target in &project.targets {
            for pattern in target.sources.iter().chain(&target.resources) {
                let base = project.path.join(glob_base(pattern));
                let valid = globset::Glob::new(pattern).is_ok();
                if !valid || !file_handler.is_dir(&base) {
                    invalid.push(InvalidGlob {
                        target: target.name.clone(),
                        pattern: pattern.clone(),
                    });
                }
            }
        }
    }
    if invalid.is_empty() {
        Ok(())
    } else {
        tracing::warn!("{} invalid glob(s) found", invalid.len());
        Err(LoaderError::InvalidGlobs(invalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuist_graph::test_utils::create_repo_with_structure;
    use tuist_graph::{FileHandler, Platform, Product, Target};

    fn project(root: &std::path::Path, targets: Vec<Target>) -> Project {
        Project {
            path: root.to_path_buf(),
            name: "App".into(),
            targets,
            packages: vec![],
        }
    }

    fn target_with(name: &str, sources: &[&str], resources: &[&str]) -> Target {
        let mut target = Target::new(name, Platform::IOS, Product::Framework);
        target.sources = sources.iter().map(|s| s.to_string()).collect();
        target.resources = resources.iter().map(|s| s.to_string()).collect();
        target
    }

    #[test]
    fn existing_directories_pass() {
        let repo = create_repo_with_structure(&[("Sources/a.swift", "")]);
        let projects = [project(repo.path(), vec![target_with("A", &["Sources/**/*.swift"], &[])])];
        assert!(lint_globs(&projects, &FileHandler).is_ok());
    }

    #[test]
    fn failures_across_targets_are_aggregated() {
        let repo = create_repo_with_structure(&[("Sources/a.swift", "")]);
        let projects = [project(
            repo.path(),
            vec![
                target_with("A", &["Missing/**/*.swift"], &[]),
                target_with("B", &["Sources/*.swift"], &["Assets/*.png"]),
            ],
        )];
        let Err(LoaderError::InvalidGlobs(globs)) = lint_globs(&projects, &FileHandler) else {
            panic!("expected invalid globs");
        };
        assert_eq!(
            globs,
            vec![
                InvalidGlob {
                    target: "A".into(),
                    pattern: "Missing/**/*.swift".into()
                },
                InvalidGlob {
                    target: "B".into(),
                    pattern: "Assets/*.png".into()
                },
            ]
        );
    }
}
