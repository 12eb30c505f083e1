//! Package references - WHAT the caller asks to build.
//!
//! A reference is either an identifier (`golang.org/x/text/language@v0.22.0`)
//! that is meaningful anywhere, or a location (`./cmd/tool`) that only means
//! something relative to the caller's working directory. Inside a workspace
//! locations have to be re-expressed.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::workspace::BaseManifest;
use crate::util::errors::{Error, Result};
use crate::util::fs::{absolute, is_inside, relative_path, to_slash};

/// A classified package reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageReference {
    /// Globally addressable name with an optional version query.
    Identifier {
        name: String,
        version: Option<String>,
    },
    /// Filesystem location, absolute and lexically cleaned.
    Location { path: PathBuf },
}

impl PackageReference {
    /// Classify `reference` by its shape alone; locations are made absolute
    /// against `cwd`. The filesystem is never consulted.
    pub fn classify(reference: &str, cwd: &Path) -> Self {
        if is_location(reference) {
            PackageReference::Location {
                path: absolute(cwd, Path::new(reference)),
            }
        } else {
            let (name, version) = split_version(reference);
            PackageReference::Identifier {
                name: name.to_string(),
                version: version.map(str::to_string),
            }
        }
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageReference::Identifier {
                name,
                version: Some(v),
            } => write!(f, "{name}@{v}"),
            PackageReference::Identifier { name, version: None } => write!(f, "{name}"),
            PackageReference::Location { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Whether `reference` has the shape of a filesystem path.
///
/// Both Unix and Windows spellings are recognized regardless of the host,
/// since manifests travel between systems.
pub fn is_location(reference: &str) -> bool {
    let bytes = reference.as_bytes();
    reference == "."
        || reference == ".."
        || reference.starts_with("./")
        || reference.starts_with(".\\")
        || reference.starts_with("../")
        || reference.starts_with("..\\")
        || reference.starts_with('/')
        || reference.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Split `name@version` into its parts.
pub fn split_version(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once('@') {
        Some((name, version)) if !name.is_empty() => (name, Some(version)),
        _ => (reference, None),
    }
}

/// Re-express `reference`, given relative to `cwd`, for use inside the
/// workspace.
///
/// Identifiers are returned unchanged. Locations become
/// `<owning identity>/<path below the manifest root>` when a base manifest
/// governs them, or their absolute path otherwise.
pub fn resolve_for_workspace(
    reference: &str,
    cwd: &Path,
    base: Option<&BaseManifest>,
) -> Result<String> {
    let path = match PackageReference::classify(reference, cwd) {
        PackageReference::Identifier { .. } => return Ok(reference.to_string()),
        PackageReference::Location { path } => path,
    };

    let Some(base) = base else {
        return Ok(path.to_string_lossy().into_owned());
    };

    // A path outside the governing tree has no scoped name.
    if !is_inside(&path, &base.root) {
        tracing::debug!(
            "{} lies outside {}, keeping the absolute path",
            path.display(),
            base.root.display()
        );
        return Ok(path.to_string_lossy().into_owned());
    }

    let identity = base.owning_identity.as_deref().ok_or_else(|| {
        Error::resolution(
            reference,
            format!(
                "no package identity owns {} (manifest {})",
                path.display(),
                base.path.display()
            ),
        )
    })?;

    let rel = to_slash(&relative_path(&base.root, &path));
    if rel.is_empty() || rel == "." {
        Ok(identity.to_string())
    } else {
        Ok(format!("{identity}/{rel}"))
    }
}
