//! Tree fingerprints for asserting that source trees stay untouched.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::util::errors::{Error, IoResultExt, Result};
use crate::util::fs::to_slash;
use crate::util::hash::Fingerprint;

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).fs_context("open", path)?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).fs_context("read", path)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint a whole directory tree: relative paths, file contents and
/// symlink targets, visited in a stable order.
pub fn hash_tree(root: &Path) -> Result<String> {
    let mut fp = Fingerprint::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::fs("walk", &path, e.into())
        })?;
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        fp.update_str(&to_slash(rel));

        let ty = entry.file_type();
        if ty.is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("read link", entry.path())?;
            fp.update_str("link").update_str(&target.to_string_lossy());
        } else if ty.is_file() {
            fp.update_str("file").update_str(&sha256_file(entry.path())?);
        } else {
            fp.update_str("dir");
        }
    }

    Ok(fp.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();

        let hash = sha256_file(&path).unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_tree_detects_changes() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/a.go"), "package sub").unwrap();

        let before = hash_tree(tmp.path()).unwrap();
        assert_eq!(before, hash_tree(tmp.path()).unwrap());

        std::fs::write(tmp.path().join("sub/a.go"), "package changed").unwrap();
        assert_ne!(before, hash_tree(tmp.path()).unwrap());
    }
}
