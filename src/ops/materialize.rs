//! Materialization of dependency packages into the overlay directory.
//!
//! A package is materialized at most once per workspace: its source tree is
//! located through the toolchain, mirrored below `overlay/<module path>`
//! and the workspace manifest is redirected to the mirror. Files are hard
//! linked when possible, so a mirror costs no extra disk space until an
//! override replaces one of its files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::reference::split_version;
use crate::core::workspace::{RedirectKind, Workspace};
use crate::ops::redirect::add_redirect;
use crate::toolchain::Toolchain;
use crate::util::config::LinkMode;
use crate::util::errors::{Error, IoResultExt, Result};
use crate::util::fs::ensure_dir;

/// Version control metadata never mirrored.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

/// Counts from one tree copy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub linked: usize,
    pub copied: usize,
}

/// Ensure `package` (optionally `path@version`) has a private tree in the
/// workspace and return its directory.
pub fn materialize(
    toolchain: &dyn Toolchain,
    ws: &mut Workspace,
    package: &str,
) -> Result<PathBuf> {
    let module = split_version(package).0;
    if let Some(dir) = ws.materialized_dir(module) {
        return Ok(dir.to_path_buf());
    }

    let dst = ws.package_dir(module)?;
    toolchain.fetch(ws.root(), &[package.to_string()])?;
    let src = toolchain.locate(ws.root(), package)?;

    match fs::symlink_metadata(&dst) {
        Ok(meta) if !meta.is_dir() => {
            return Err(Error::LayoutConflict {
                path: dst,
                expected: "directory",
            })
        }
        Ok(_) => tracing::debug!("{} already present, not copying", dst.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let stats = copy_tree(&src, &dst, ws.link_mode(), ws.root())?;
            tracing::info!(
                "materialized {} ({} linked, {} copied)",
                module,
                stats.linked,
                stats.copied
            );
        }
        Err(e) => return Err(Error::fs("inspect", &dst, e)),
    }

    add_redirect(toolchain, ws, module, &dst, RedirectKind::Overlay)?;
    ws.record_materialized(module, dst.clone());
    Ok(dst)
}

/// Mirror `src` into `dst`, skipping version control metadata and anything
/// below `exclude`.
///
/// Symlinks are resolved: a linked directory becomes a real directory and a
/// linked file a regular file, so nothing in the mirror points back into
/// the source tree.
pub fn copy_tree(src: &Path, dst: &Path, mode: LinkMode, exclude: &Path) -> Result<CopyStats> {
    let mut stats = CopyStats::default();
    let real_exclude = fs::canonicalize(exclude).unwrap_or_else(|_| exclude.to_path_buf());

    let walker = WalkDir::new(src)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let vcs = e.depth() > 0
                && e.file_name()
                    .to_str()
                    .is_some_and(|name| VCS_DIRS.contains(&name));
            // the workspace may live inside the tree it mirrors
            let excluded = e.path().starts_with(exclude)
                || (e.path_is_symlink()
                    && fs::canonicalize(e.path()).is_ok_and(|p| p.starts_with(&real_exclude)));
            !vcs && !excluded
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(src).to_path_buf();
                if e.loop_ancestor().is_none() && is_dangling(&path) {
                    tracing::warn!("skipping dangling symlink {}", path.display());
                    continue;
                }
                return Err(Error::fs("walk", &path, e.into()));
            }
        };
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
            continue;
        }

        let source = if entry.path_is_symlink() {
            fs::canonicalize(entry.path()).fs_context("resolve", entry.path())?
        } else {
            entry.path().to_path_buf()
        };
        if link_or_copy(&source, &target, mode)? {
            stats.linked += 1;
        } else {
            stats.copied += 1;
        }
    }

    Ok(stats)
}

fn is_dangling(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
        && fs::metadata(path).is_err()
}

/// Hard link `src` to `dst`, falling back to a copy. Returns whether a
/// link was made.
fn link_or_copy(src: &Path, dst: &Path, mode: LinkMode) -> Result<bool> {
    if mode == LinkMode::Hardlink {
        match fs::hard_link(src, dst) {
            Ok(()) => return Ok(true),
            Err(e) => tracing::debug!("hard link {} failed ({}), copying", src.display(), e),
        }
    }
    fs::copy(src, dst).fs_context("copy", dst)?;
    Ok(false)
}
