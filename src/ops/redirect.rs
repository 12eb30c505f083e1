//! Redirect injection into the workspace manifest.

use std::path::Path;

use crate::core::workspace::{RedirectKind, Workspace};
use crate::toolchain::Toolchain;
use crate::util::errors::{Error, Result};

/// Redirect `package` to `target_dir` in the workspace manifest.
///
/// Injecting the same redirect twice is a no-op. An overlay redirect may
/// supersede the base redirect of the caller's own module; any other
/// attempt to point an already redirected package elsewhere fails.
pub fn add_redirect(
    toolchain: &dyn Toolchain,
    ws: &mut Workspace,
    package: &str,
    target_dir: &Path,
    kind: RedirectKind,
) -> Result<()> {
    let target = ws.manifest_location(target_dir);

    if let Some(existing) = ws.redirect(package) {
        if existing.target == target {
            tracing::debug!("{} already redirected to {}", package, target);
            return Ok(());
        }
        let supersedes = existing.kind == RedirectKind::Base && kind == RedirectKind::Overlay;
        if !supersedes {
            return Err(Error::RedirectConflict {
                package: package.to_string(),
                existing: existing.target.clone(),
                requested: target,
            });
        }
    }

    tracing::debug!("redirecting {} => {}", package, target);
    toolchain.edit_redirect(ws.root(), package, &target)?;
    ws.record_redirect(package, target, kind);
    Ok(())
}
