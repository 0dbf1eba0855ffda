//! `.tar.gz` archives of cached bundles
//!
//! These functions block; async callers run them on the blocking pool.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use md5::{Digest, Md5};

use crate::error::CacheError;

/// Archives the file or directory at `path` with its own name as the root entry.
pub fn archive(path: &Path) -> Result<Vec<u8>, CacheError> {
    let archive_error = |source| CacheError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let name = path.file_name().ok_or_else(|| {
        archive_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no file name",
        ))
    })?;

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    // Framework bundles rely on `Versions/Current` symlinks.
    builder.follow_symlinks(false);
    if path.is_dir() {
        builder.append_dir_all(name, path).map_err(archive_error)?;
    } else {
        builder
            .append_path_with_name(path, name)
            .map_err(archive_error)?;
    }
    let encoder = builder.into_inner().map_err(archive_error)?;
    encoder.finish().map_err(archive_error)
}

/// Unpacks an archive produced by [`archive`] into `destination`.
pub fn unarchive(bytes: &[u8], destination: &Path) -> Result<(), CacheError> {
    let unarchive_error = |source| CacheError::Unarchive {
        path: destination.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(destination).map_err(unarchive_error)?;
    tar::Archive::new(GzDecoder::new(bytes))
        .unpack(destination)
        .map_err(unarchive_error)
}

/// Base64 MD5 digest, the format of the `Content-MD5` header.
pub fn content_md5(bytes: &[u8]) -> String {
    STANDARD.encode(Md5::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuist_graph::test_utils::create_repo_with_structure;

    #[test]
    fn bundle_survives_a_round_trip() {
        let repo = create_repo_with_structure(&[
            ("B.xcframework/Info.plist", "plist"),
            ("B.xcframework/ios-arm64/B.framework/B", "binary"),
        ]);
        let bytes = archive(&repo.path().join("B.xcframework")).unwrap();

        let out = tempfile::tempdir().unwrap();
        unarchive(&bytes, out.path()).unwrap();
        let binary = out.path().join("B.xcframework/ios-arm64/B.framework/B");
        assert_eq!(std::fs::read_to_string(binary).unwrap(), "binary");
    }

    #[test]
    fn md5_is_base64() {
        insta::assert_snapshot!(content_md5(b"tuist"), @"ofcS66Z7h4SqzqkDeL0s9Q==");
    }

    #[test]
    fn garbage_cannot_be_unarchived() {
        let out = tempfile::tempdir().unwrap();
        let err = unarchive(b"not a tarball", out.path()).unwrap_err();
        assert!(matches!(err, CacheError::Unarchive { .. }));
    }
}
