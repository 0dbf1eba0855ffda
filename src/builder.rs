//! Builds cacheable targets with xcodebuild

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use tuist_cache::{ArtifactBuilding, CacheError};
use tuist_graph::{GraphTarget, Platform, ValueGraph};
use tuist_hasher::CacheOutputType;

/// `generic/platform=...` destinations: the device and, where there is one,
/// the simulator.
fn destinations(platform: Platform) -> (&'static str, Option<&'static str>) {
    match platform {
        Platform::IOS => ("generic/platform=iOS", Some("generic/platform=iOS Simulator")),
        Platform::TvOS => ("generic/platform=tvOS", Some("generic/platform=tvOS Simulator")),
        Platform::WatchOS => (
            "generic/platform=watchOS",
            Some("generic/platform=watchOS Simulator"),
        ),
        Platform::MacOS => ("generic/platform=macOS", None),
    }
}

pub struct XcodeBuilder {
    program: String,
    configuration: String,
    /// Project names by project directory.
    projects: BTreeMap<PathBuf, String>,
}

impl XcodeBuilder {
    pub fn new(graph: &ValueGraph, configuration: String) -> Self {
        XcodeBuilder {
            program: "xcodebuild".to_string(),
            configuration,
            projects: graph
                .projects
                .iter()
                .map(|(path, project)| (path.clone(), project.name.clone()))
                .collect(),
        }
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn project_file(&self, target: &GraphTarget) -> Result<PathBuf, CacheError> {
        let name = self.projects.get(&target.path).ok_or_else(|| CacheError::Build {
            target: target.name().to_string(),
            reason: format!("no project at {}", target.path.display()),
        })?;
        Ok(target.path.join(format!("{name}.xcodeproj")))
    }

    fn archive_arguments(
        &self,
        project: &Path,
        target: &GraphTarget,
        destination: &str,
        archive: &Path,
    ) -> Vec<String> {
        vec![
            "archive".to_string(),
            "-project".to_string(),
            project.display().to_string(),
            "-scheme".to_string(),
            target.name().to_string(),
            "-configuration".to_string(),
            self.configuration.clone(),
            "-destination".to_string(),
            destination.to_string(),
            "-archivePath".to_string(),
            archive.display().to_string(),
            "SKIP_INSTALL=NO".to_string(),
            "BUILD_LIBRARY_FOR_DISTRIBUTION=YES".to_string(),
        ]
    }

    async fn run(&self, target: &GraphTarget, arguments: Vec<String>) -> Result<(), CacheError> {
        tracing::debug!("{} {}", self.program, arguments.join(" "));
        let failed = |reason: String| CacheError::Build {
            target: target.name().to_string(),
            reason,
        };
        let output = Command::new(&self.program)
            .args(&arguments)
            .output()
            .await
            .map_err(|e| failed(format!("couldn't run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or_default().to_string();
            return Err(failed(format!("{} exited with {}: {last}", self.program, output.status)));
        }
        Ok(())
    }
}

/// Where xcodebuild leaves the framework inside an archive.
fn archived_framework(archive: &Path, name: &str) -> PathBuf {
    archive
        .join("Products/Library/Frameworks")
        .join(format!("{name}.framework"))
}

#[async_trait::async_trait]
impl ArtifactBuilding for XcodeBuilder {
    async fn build(
        &self,
        target: &GraphTarget,
        output_type: CacheOutputType,
        output_dir: &Path,
    ) -> Result<PathBuf, CacheError> {
        let project = self.project_file(target)?;
        let name = target.name();
        let (device, simulator) = destinations(target.target.platform);

        let device_archive = output_dir.join(format!("{name}-device.xcarchive"));
        self.run(target, self.archive_arguments(&project, target, device, &device_archive))
            .await?;

        match output_type {
            CacheOutputType::Framework => Ok(archived_framework(&device_archive, name)),
            CacheOutputType::XCFramework => {
                let mut archives = vec![device_archive];
                if let Some(simulator) = simulator {
                    let archive = output_dir.join(format!("{name}-simulator.xcarchive"));
                    self.run(target, self.archive_arguments(&project, target, simulator, &archive))
                        .await?;
                    archives.push(archive);
                }

                let bundle = output_dir.join(format!("{name}.xcframework"));
                let mut arguments = vec!["-create-xcframework".to_string()];
                for archive in &archives {
                    arguments.push("-framework".to_string());
                    arguments.push(archived_framework(archive, name).display().to_string());
                }
                arguments.push("-output".to_string());
                arguments.push(bundle.display().to_string());
                self.run(target, arguments).await?;
                Ok(bundle)
            }
        }
    }
}
