//! Applying file overrides to materialized packages.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::override_item::OverrideItem;
use crate::core::workspace::Workspace;
use crate::ops::materialize::materialize;
use crate::toolchain::Toolchain;
use crate::util::errors::{Error, IoResultExt, Result};

/// Write one override into the workspace, materializing its package first.
///
/// Returns the path of the written file.
pub fn apply_override(
    toolchain: &dyn Toolchain,
    ws: &mut Workspace,
    item: &OverrideItem,
) -> Result<PathBuf> {
    let rel = item.checked_relative_path()?;
    let dir = materialize(toolchain, ws, &item.package)?;
    let dst = dir.join(rel);

    write_override(&dir, &dst, &item.content)?;
    tracing::debug!("overrode {}:{}", item.module_path(), item.relative_path);
    Ok(dst)
}

/// Replace the file at `dst`, which must lie inside `root`, without
/// touching whatever it was linked to.
///
/// The old directory entry is unlinked before writing, so a hard link into
/// a shared cache is never written through. A symlinked directory on the
/// way to `dst` is a layout conflict, as writing through it could land
/// outside `root`.
pub fn write_override(root: &Path, dst: &Path, content: &[u8]) -> Result<()> {
    let parent = dst.parent().unwrap_or(root);
    reject_symlinked_ancestors(root, parent)?;
    create_parents(parent)?;
    ensure_contained(root, parent)?;

    match fs::symlink_metadata(dst) {
        Ok(meta) if meta.is_dir() => {
            return Err(Error::LayoutConflict {
                path: dst.to_path_buf(),
                expected: "regular file",
            })
        }
        Ok(_) => match fs::remove_file(dst) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::fs("remove", dst, e)),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::fs("inspect", dst, e)),
    }

    fs::write(dst, content).fs_context("write", dst)
}

/// Fail if any existing directory between `root` and `dir` is a symlink.
fn reject_symlinked_ancestors(root: &Path, dir: &Path) -> Result<()> {
    let Ok(rel) = dir.strip_prefix(root) else {
        return Err(Error::LayoutConflict {
            path: dir.to_path_buf(),
            expected: "directory inside the package tree",
        });
    };

    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(Error::LayoutConflict {
                    path: current,
                    expected: "directory",
                })
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Fail unless `dir` resolves to a location below `root`.
fn ensure_contained(root: &Path, dir: &Path) -> Result<()> {
    let real_root = fs::canonicalize(root).fs_context("resolve", root)?;
    let real_dir = fs::canonicalize(dir).fs_context("resolve", dir)?;
    if real_dir.starts_with(&real_root) {
        Ok(())
    } else {
        Err(Error::LayoutConflict {
            path: dir.to_path_buf(),
            expected: "directory inside the package tree",
        })
    }
}

/// Create `dir` and its parents, reporting a regular file in the way as a
/// layout conflict.
fn create_parents(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) => {
            let blocking = dir
                .ancestors()
                .find(|p| fs::symlink_metadata(p).is_ok_and(|m| !m.is_dir()));
            match blocking {
                Some(path) => Err(Error::LayoutConflict {
                    path: path.to_path_buf(),
                    expected: "directory",
                }),
                None => Err(Error::fs("create directory", dir, e)),
            }
        }
    }
}
