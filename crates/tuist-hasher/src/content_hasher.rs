//! SHA-256 content hashing of bytes, strings, files and directories

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use tuist_graph::FileHandling;

use crate::error::HasherError;

/// Content hashes are lowercase hex SHA-256 digests.
pub trait ContentHashing: Send + Sync {
    fn hash_bytes(&self, bytes: &[u8]) -> String;

    fn hash_str(&self, s: &str) -> String {
        self.hash_bytes(s.as_bytes())
    }

    /// Hashes the strings in the given order. Callers sort when order
    /// shouldn't matter.
    fn hash_strings(&self, strings: &[String]) -> String;

    /// A file's bytes, or for a directory the relative path and hash of
    /// every file below it, in path order.
    fn hash_path(&self, path: &Path) -> Result<String, HasherError>;
}

#[derive(Clone)]
pub struct ContentHasher {
    file_handler: Arc<dyn FileHandling>,
}

impl ContentHasher {
    pub fn new(file_handler: Arc<dyn FileHandling>) -> Self {
        ContentHasher { file_handler }
    }

    pub fn file_handler(&self) -> &Arc<dyn FileHandling> {
        &self.file_handler
    }
}

impl ContentHashing for ContentHasher {
    fn hash_bytes(&self, bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    fn hash_strings(&self, strings: &[String]) -> String {
        let mut hasher = Sha256::new();
        for s in strings {
            // Length prefix keeps ["ab", "c"] and ["a", "bc"] apart.
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn hash_path(&self, path: &Path) -> Result<String, HasherError> {
        if !self.file_handler.is_dir(path) {
            return Ok(self.hash_bytes(&self.file_handler.read(path)?));
        }
        let mut entries = Vec::new();
        for file in self.file_handler.files(path)? {
            let relative = file
                .strip_prefix(path)
                .unwrap_or(&file)
                .to_string_lossy()
                .into_owned();
            let hash = self.hash_bytes(&self.file_handler.read(&file)?);
            entries.push(format!("{relative}:{hash}"));
        }
        Ok(self.hash_strings(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuist_graph::test_utils::create_repo_with_structure;
    use tuist_graph::FileHandler;

    fn hasher() -> ContentHasher {
        ContentHasher::new(Arc::new(FileHandler))
    }

    #[test]
    fn sha256_hex() {
        insta::assert_snapshot!(
            hasher().hash_str("tuist"),
            @"95bb0f482d8e70cc5d251776b2792b128e3af96bcd7c146e966f4df4e128b90e"
        );
    }

    #[test]
    fn string_boundaries_matter() {
        let h = hasher();
        assert_ne!(
            h.hash_strings(&["ab".into(), "c".into()]),
            h.hash_strings(&["a".into(), "bc".into()])
        );
    }

    #[test]
    fn directory_hash_covers_names_and_contents() {
        let bundle = |binary: &'static str| [("B.framework/B", binary), ("B.framework/Info.plist", "p")];
        let a = create_repo_with_structure(&bundle("bin"));
        let b = create_repo_with_structure(&bundle("bin"));
        let c = create_repo_with_structure(&bundle("bin2"));
        let h = hasher();
        let hash = |root: &Path| h.hash_path(&root.join("B.framework")).unwrap();

        assert_eq!(hash(a.path()), hash(b.path()));
        assert_ne!(hash(a.path()), hash(c.path()));
        assert_eq!(hash(a.path()).len(), 64);
    }
}
