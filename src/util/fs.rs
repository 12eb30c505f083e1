//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::util::errors::{IoResultExt, Result};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).fs_context("create directory", path)
}

/// Read a file to string.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).fs_context("read", path)
}

/// Write bytes to a file, creating parent directories if needed.
pub fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).fs_context("write", path)
}

/// Lexically normalize a path: drop `.` components and fold `..` into
/// the preceding component. Symlinks are not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make `path` absolute against `base` and clean it.
pub fn absolute(base: &Path, path: &Path) -> PathBuf {
    clean_path(&base.join(path))
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Render a relative path the way module directives expect: always with a
/// leading `./` or `../`.
pub fn dot_relative(path: &Path) -> String {
    let slashed = to_slash(path);
    if slashed.is_empty() || slashed == "." {
        "./".to_string()
    } else if slashed == ".." || slashed.starts_with("../") || slashed.starts_with("./") {
        slashed
    } else {
        format!("./{slashed}")
    }
}

/// Check if a path is inside another path.
pub fn is_inside(path: &Path, parent: &Path) -> bool {
    path.starts_with(parent)
}
