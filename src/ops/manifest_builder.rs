//! Building the workspace manifest.
//!
//! When the caller works inside a module, the workspace manifest starts as a
//! copy of the caller's one under a fresh identity. The caller's module is
//! then required at a placeholder version and redirected to its directory,
//! so that everything the caller could build is still buildable from the
//! workspace. Outside any module an empty manifest is initialized instead.

use std::path::{Path, PathBuf};

use crate::core::manifest::{lock_path_for, Manifest, RedirectTarget};
use crate::core::workspace::{generate_identity, BaseManifest, RedirectKind, Workspace};
use crate::ops::redirect::add_redirect;
use crate::toolchain::Toolchain;
use crate::util::context::Context;
use crate::util::errors::{Error, IoResultExt, Result};
use crate::util::fs::{absolute, dot_relative, relative_path};

/// Version required for the caller's module; the redirect decides the source.
pub const PLACEHOLDER_VERSION: &str = "v0.0.0";

/// Write the workspace manifest and return the caller's manifest, if any.
pub fn build(
    ctx: &Context,
    toolchain: &dyn Toolchain,
    ws: &mut Workspace,
) -> Result<Option<BaseManifest>> {
    let Some(original) = toolchain.current_manifest_location(ctx.cwd()) else {
        tracing::debug!("no manifest governs {}", ctx.cwd().display());
        toolchain.init_manifest(ws.root(), ws.identity())?;
        return Ok(None);
    };

    let original = absolute(ctx.cwd(), &original);
    let original_root = original
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::resolution(original.display().to_string(), "manifest has no parent directory"))?;
    tracing::debug!("deriving workspace manifest from {}", original.display());

    let mut manifest = Manifest::load(&original)?;
    let original_identity = manifest.identity().map(str::to_string);

    if original_identity.as_deref() == Some(ws.identity()) {
        ws.set_identity(generate_identity(ws.root(), original_identity.as_deref()));
    }
    manifest.set_identity(ws.identity());
    reanchor_redirects(&mut manifest, &resolved(&original_root), &resolved(ws.root()));
    if let Some(identity) = &original_identity {
        manifest.add_requirement(identity, PLACEHOLDER_VERSION);
    }
    manifest.save(&ws.manifest_path())?;

    let lock = lock_path_for(&original);
    if lock.is_file() {
        std::fs::copy(&lock, ws.lockfile_path()).fs_context("copy", &lock)?;
    }

    if let Some(identity) = &original_identity {
        add_redirect(toolchain, ws, identity, &original_root, RedirectKind::Base)?;
    }

    let owning_identity = toolchain
        .current_owning_identity(ctx.cwd())
        .or_else(|| original_identity.clone());

    Ok(Some(BaseManifest {
        path: original,
        root: original_root,
        identity: original_identity.unwrap_or_default(),
        owning_identity,
    }))
}

/// The symlink-free form of `path`, or `path` itself if it cannot be
/// resolved. `go` interprets relative redirects from the resolved location.
fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Rewrite relative directory redirects, which were relative to `from`, to
/// be relative to `to`.
pub fn reanchor_redirects(manifest: &mut Manifest, from: &Path, to: &Path) {
    for redirect in &mut manifest.replaces {
        let RedirectTarget::Directory(dir) = &mut redirect.new else {
            continue;
        };
        if Path::new(dir.as_str()).is_absolute() {
            continue;
        }
        let target = absolute(from, Path::new(dir.as_str()));
        *dir = dot_relative(&relative_path(to, &target));
    }
}
