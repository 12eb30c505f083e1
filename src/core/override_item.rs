//! File overrides supplied by the caller.

use std::path::PathBuf;

use crate::core::reference::{is_location, split_version};
use crate::util::errors::{Error, Result};

/// Replacement content for one file of one dependency package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideItem {
    /// Module path of the package, optionally with `@version`
    pub package: String,

    /// Slash-separated path below the package root
    pub relative_path: String,

    /// New file content
    pub content: Vec<u8>,
}

impl OverrideItem {
    /// Create a new override.
    pub fn new(
        package: impl Into<String>,
        relative_path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        OverrideItem {
            package: package.into(),
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }

    /// The module path without any version.
    pub fn module_path(&self) -> &str {
        split_version(&self.package).0
    }

    /// The file path below the package root, checked to stay inside it.
    pub fn checked_relative_path(&self) -> Result<PathBuf> {
        let reject = |reason: &str| {
            Error::resolution(
                format!("{}:{}", self.package, self.relative_path),
                reason.to_string(),
            )
        };

        let raw = self.relative_path.as_str();
        let escapes_root = is_location(raw) && !raw.starts_with("./");
        if escapes_root || raw.contains('\\') {
            return Err(reject("override path must be relative to the package root"));
        }

        let mut path = PathBuf::new();
        for component in raw.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(reject("override path escapes the package root")),
                c => path.push(c),
            }
        }
        if path.as_os_str().is_empty() {
            return Err(reject("override path names no file"));
        }
        Ok(path)
    }
}

/// Directory, relative to the overlay root, that holds a package's tree.
///
/// Each `/`-separated component of the module path becomes one directory.
pub fn package_dir(package: &str) -> Result<PathBuf> {
    if package.is_empty() || is_location(package) || package.contains('\\') {
        return Err(Error::resolution(
            package,
            "expected a module path, not a filesystem location",
        ));
    }

    let mut dir = PathBuf::new();
    for component in package.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(Error::resolution(
                package,
                format!("invalid module path element `{component}`"),
            ));
        }
        dir.push(component);
    }
    Ok(dir)
}
