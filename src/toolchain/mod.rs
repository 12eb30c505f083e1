//! Toolchain abstraction for the module system.
//!
//! Provisioning never resolves dependencies itself. Everything that needs
//! knowledge of the dependency graph (initializing a manifest, fetching,
//! locating a module's source directory, editing redirects) goes through
//! the [`Toolchain`] trait, implemented for the `go` command by
//! [`GoToolchain`].

use std::path::{Path, PathBuf};

use crate::util::errors::Result;

mod go;

pub use go::GoToolchain;

/// Operations provisioning needs from the host toolchain.
///
/// Every operation takes the directory it applies to explicitly; none may
/// depend on the process working directory.
pub trait Toolchain {
    /// Create an empty manifest in `dir` declaring `identity`.
    fn init_manifest(&self, dir: &Path, identity: &str) -> Result<()>;

    /// The manifest governing `cwd`, if any.
    ///
    /// This is a best-effort probe: failures mean "no manifest".
    fn current_manifest_location(&self, cwd: &Path) -> Option<PathBuf>;

    /// Resolve `references` into the manifest and lock data rooted at `dir`.
    fn fetch(&self, dir: &Path, references: &[String]) -> Result<()>;

    /// The on-disk source directory of `package` as seen from `dir`.
    fn locate(&self, dir: &Path, package: &str) -> Result<PathBuf>;

    /// The identity of the package owning `dir`, if any.
    fn current_owning_identity(&self, dir: &Path) -> Option<String>;

    /// Add or update the redirect `package => target` in the manifest at `dir`.
    fn edit_redirect(&self, dir: &Path, package: &str, target: &str) -> Result<()>;
}
