//! File-system access behind a trait so loaders and storages can be tested

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use globset::GlobBuilder;
use ignore::WalkBuilder;

use crate::error::FsError;

/// Everything the core needs from the file system.
pub trait FileHandling: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Files under `dir` matching `pattern` (relative to `dir`), sorted.
    fn glob(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError>;
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;
    /// Writes through a temporary sibling file and a rename.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;
    /// Removes a file or a whole directory. Missing paths are not an error.
    fn delete(&self, path: &Path) -> Result<(), FsError>;
    /// Direct children of `dir`, sorted.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError>;
    /// Every file below `dir`, recursively, sorted.
    fn files(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError>;
    /// Copies a file or a directory tree.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
}

/// [`FileHandling`] over the real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileHandler;

impl FileHandling for FileHandler {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn glob(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| FsError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?
            .compile_matcher();

        let base = dir.join(glob_base(pattern));
        if !base.exists() {
            return Ok(Vec::new());
        }
        let mut matches: Vec<PathBuf> = self
            .files(&base)?
            .into_iter()
            .filter(|file| {
                file.strip_prefix(dir)
                    .map(|rel| matcher.is_match(rel))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        Ok(matches)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(|e| FsError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{}.{nanos}.tmp", std::process::id()));
        std::fs::write(&tmp, contents).map_err(|e| FsError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            FsError::io(path, e)
        })
    }

    fn delete(&self, path: &Path) -> Result<(), FsError> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io(path, e)),
        }
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        let mut entries = std::fs::read_dir(dir)
            .map_err(|e| FsError::io(dir, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FsError::io(dir, e))?;
        entries.sort();
        Ok(entries)
    }

    fn files(&self, dir: &Path) -> Result<Vec<PathBuf>, FsError> {
        let mut files = Vec::new();
        // Hidden files and ignore rules don't change what a target compiles.
        for entry in WalkBuilder::new(dir).standard_filters(false).build() {
            let entry = entry.map_err(|e| {
                FsError::io(dir, std::io::Error::other(e.to_string()))
            })?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if !from.is_dir() {
            if let Some(parent) = to.parent() {
                self.create_dir_all(parent)?;
            }
            std::fs::copy(from, to).map_err(|e| FsError::io(from, e))?;
            return Ok(());
        }
        self.create_dir_all(to)?;
        for file in self.files(from)? {
            let Ok(relative) = file.strip_prefix(from) else {
                continue;
            };
            let destination = to.join(relative);
            if let Some(parent) = destination.parent() {
                self.create_dir_all(parent)?;
            }
            std::fs::copy(&file, &destination).map_err(|e| FsError::io(&file, e))?;
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
    }
}

/// The literal directory prefix of a glob: `Sources/**/*.swift` → `Sources`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<Component<'_>> = Path::new(pattern).components().collect();
    let last = components.len().saturating_sub(1);
    for (i, component) in components.iter().enumerate() {
        let text = component.as_os_str().to_string_lossy();
        if i == last || text.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(component);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("Sources/**/*.swift"), PathBuf::from("Sources"));
        assert_eq!(glob_base("App/Sources/*.swift"), PathBuf::from("App/Sources"));
        assert_eq!(glob_base("main.swift"), PathBuf::new());
        assert_eq!(glob_base("**/*.swift"), PathBuf::new());
    }

    #[test]
    fn glob_matches_nested_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Sources/Nested")).unwrap();
        std::fs::write(root.join("Sources/b.swift"), "b").unwrap();
        std::fs::write(root.join("Sources/Nested/a.swift"), "a").unwrap();
        std::fs::write(root.join("Sources/readme.md"), "#").unwrap();

        let found = FileHandler.glob(root, "Sources/**/*.swift").unwrap();
        assert_eq!(
            found,
            vec![
                root.join("Sources/Nested/a.swift"),
                root.join("Sources/b.swift"),
            ]
        );
    }

    #[test]
    fn glob_with_missing_base_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileHandler.glob(dir.path(), "Missing/**/*.swift").unwrap().is_empty());
    }

    #[test]
    fn write_is_atomic_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue/event.json");
        FileHandler.write(&path, b"{}").unwrap();
        FileHandler.write(&path, b"{\"a\":1}").unwrap();

        assert_eq!(FileHandler.read(&path).unwrap(), b"{\"a\":1}");
        assert_eq!(FileHandler.list(&dir.path().join("queue")).unwrap(), vec![path]);
    }

    #[test]
    fn copy_and_delete_directory_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("B.framework");
        std::fs::create_dir_all(src.join("Headers")).unwrap();
        std::fs::write(src.join("B"), "binary").unwrap();
        std::fs::write(src.join("Headers/B.h"), "header").unwrap();

        let dst = dir.path().join("copy/B.framework");
        FileHandler.copy(&src, &dst).unwrap();
        assert_eq!(FileHandler.read(&dst.join("Headers/B.h")).unwrap(), b"header");

        FileHandler.delete(&dst).unwrap();
        assert!(!dst.exists());
        FileHandler.delete(&dst).unwrap();
    }
}
