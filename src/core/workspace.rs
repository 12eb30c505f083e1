//! Workspace - the ephemeral build root.
//!
//! A Workspace owns the rewritten manifest, the overlay directory holding
//! one private tree per overridden package, and the bookkeeping that keeps
//! materialization and redirect injection at most once per package.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::manifest::Manifest;
use crate::core::override_item::package_dir;
use crate::util::config::LinkMode;
use crate::util::errors::Result;
use crate::util::fs::{dot_relative, is_inside, relative_path};
use crate::util::hash::Fingerprint;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "go.mod";

/// Lock data file name.
pub const LOCKFILE_NAME: &str = "go.sum";

/// Directory below the workspace root that holds materialized packages.
pub const OVERLAY_DIR_NAME: &str = "overlay";

/// Prefix of generated workspace identities.
pub const IDENTITY_PREFIX: &str = "overmod_";

/// The caller's own manifest that the workspace was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseManifest {
    /// Path of the original manifest file
    pub path: PathBuf,

    /// Directory containing it
    pub root: PathBuf,

    /// Identity declared by the original manifest
    pub identity: String,

    /// Identity of the package owning the caller's working directory
    pub owning_identity: Option<String>,
}

/// Why a redirect was injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Keeps the original identity resolvable from the workspace.
    Base,
    /// Points a package at its materialized overlay tree.
    Overlay,
}

/// A redirect injected into the workspace manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedRedirect {
    pub target: String,
    pub kind: RedirectKind,
}

/// An ephemeral workspace.
#[derive(Debug)]
pub struct Workspace {
    /// Root directory
    root: PathBuf,

    /// Generated identity of the workspace manifest
    identity: String,

    /// How dependency trees are materialized
    link_mode: LinkMode,

    /// Materialized trees by module path
    materialized: BTreeMap<String, PathBuf>,

    /// Injected redirects by module path
    redirects: BTreeMap<String, InjectedRedirect>,
}

impl Workspace {
    /// Create a workspace rooted at an existing directory.
    pub fn new(root: PathBuf, identity: impl Into<String>) -> Self {
        Workspace {
            root,
            identity: identity.into(),
            link_mode: LinkMode::default(),
            materialized: BTreeMap::new(),
            redirects: BTreeMap::new(),
        }
    }

    /// Set how dependency trees are materialized.
    pub fn with_link_mode(mut self, link_mode: LinkMode) -> Self {
        self.link_mode = link_mode;
        self
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the workspace identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Replace the workspace identity.
    pub fn set_identity(&mut self, identity: impl Into<String>) {
        self.identity = identity.into();
    }

    /// Get the link mode.
    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    /// Get the manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// Get the lock data path.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Get the overlay directory.
    pub fn overlay_dir(&self) -> PathBuf {
        self.root.join(OVERLAY_DIR_NAME)
    }

    /// Where `package`'s private tree lives (whether or not it exists yet).
    pub fn package_dir(&self, package: &str) -> Result<PathBuf> {
        Ok(self.overlay_dir().join(package_dir(package)?))
    }

    /// Load the current workspace manifest.
    pub fn manifest(&self) -> Result<Manifest> {
        Manifest::load(&self.manifest_path())
    }

    /// The materialized tree of `package`, if it was visited.
    pub fn materialized_dir(&self, package: &str) -> Option<&Path> {
        self.materialized.get(package).map(PathBuf::as_path)
    }

    /// Record that `package` has been materialized at `dir`.
    pub fn record_materialized(&mut self, package: &str, dir: PathBuf) {
        self.materialized.insert(package.to_string(), dir);
    }

    /// Visited packages in order of module path.
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.materialized.keys().map(String::as_str)
    }

    /// The redirect injected for `package`, if any.
    pub fn redirect(&self, package: &str) -> Option<&InjectedRedirect> {
        self.redirects.get(package)
    }

    /// Record an injected redirect.
    pub fn record_redirect(&mut self, package: &str, target: String, kind: RedirectKind) {
        self.redirects
            .insert(package.to_string(), InjectedRedirect { target, kind });
    }

    /// Express `dir` the way the workspace manifest refers to it: `./`-relative
    /// when inside the workspace, unchanged otherwise.
    pub fn manifest_location(&self, dir: &Path) -> String {
        if is_inside(dir, &self.root) {
            dot_relative(&relative_path(&self.root, dir))
        } else {
            dir.to_string_lossy().into_owned()
        }
    }
}

/// Generate a workspace identity unlikely to collide with any other
/// manifest, and never equal to `avoid`.
pub fn generate_identity(root: &Path, avoid: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let mut salt = 0u32;
    loop {
        let mut fp = Fingerprint::new();
        fp.update_str(&now.as_nanos().to_string())
            .update_str(&std::process::id().to_string())
            .update_str(&root.to_string_lossy())
            .update_str(&salt.to_string());
        let identity = format!("{IDENTITY_PREFIX}{}_{}", now.as_secs(), fp.finish_short());
        if avoid != Some(identity.as_str()) {
            return identity;
        }
        salt += 1;
    }
}
