//! Test utilities for unit tests.
//!
//! [`FakeToolchain`] stands in for the `go` command: it edits manifests with
//! the crate's own parser and serves module directories from a registry of
//! fixture trees, recording every call so tests can assert on them.

pub mod fixtures;
pub mod tree;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::manifest::{Manifest, RedirectTarget};
use crate::core::reference::{is_location, split_version};
use crate::core::workspace::MANIFEST_NAME;
use crate::toolchain::Toolchain;
use crate::util::errors::{Error, Result};
use crate::util::fs::absolute;

// Re-export fixtures for convenience
pub use fixtures::*;
pub use tree::hash_tree;

/// Version `fetch` records for modules requested without one.
pub const FAKE_VERSION: &str = "v1.0.0";

/// In-process toolchain double.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    modules: BTreeMap<String, PathBuf>,
    report_owner: bool,
    fetches: RefCell<Vec<Vec<String>>>,
    locates: RefCell<Vec<String>>,
    edits: RefCell<Vec<(String, String)>>,
}

impl FakeToolchain {
    /// Create a toolchain that knows no modules.
    pub fn new() -> Self {
        FakeToolchain {
            report_owner: true,
            ..Default::default()
        }
    }

    /// Serve `module` from `dir`.
    pub fn with_module(mut self, module: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.modules.insert(module.into(), dir.into());
        self
    }

    /// Make the owning-identity probe fail.
    pub fn without_owner(mut self) -> Self {
        self.report_owner = false;
        self
    }

    /// Every `fetch` call, in order.
    pub fn fetches(&self) -> Vec<Vec<String>> {
        self.fetches.borrow().clone()
    }

    /// How many times `module` was located.
    pub fn locate_count(&self, module: &str) -> usize {
        self.locates.borrow().iter().filter(|m| *m == module).count()
    }

    /// Every `edit_redirect` call as `(package, target)`.
    pub fn edits(&self) -> Vec<(String, String)> {
        self.edits.borrow().clone()
    }

    /// The registered module a package path belongs to.
    fn module_of(&self, package: &str) -> Option<&str> {
        self.modules
            .keys()
            .filter(|m| package == m.as_str() || package.starts_with(&format!("{m}/")))
            .max_by_key(|m| m.len())
            .map(String::as_str)
    }

    fn failure(command: String, stderr: String) -> Error {
        Error::ExternalCommand {
            command,
            status: "exit status: 1".to_string(),
            stderr,
        }
    }
}

impl Toolchain for FakeToolchain {
    fn init_manifest(&self, dir: &Path, identity: &str) -> Result<()> {
        let mut manifest = Manifest::new(identity);
        manifest.go = Some("1.21".to_string());
        manifest.save(&dir.join(MANIFEST_NAME))
    }

    fn current_manifest_location(&self, cwd: &Path) -> Option<PathBuf> {
        cwd.ancestors()
            .map(|dir| dir.join(MANIFEST_NAME))
            .find(|path| path.is_file())
    }

    fn fetch(&self, dir: &Path, references: &[String]) -> Result<()> {
        self.fetches.borrow_mut().push(references.to_vec());

        let path = dir.join(MANIFEST_NAME);
        let mut manifest = Manifest::load(&path)?;
        for reference in references {
            let (name, version) = split_version(reference);
            if manifest.replaces.iter().any(|r| {
                name == r.old.path || name.starts_with(&format!("{}/", r.old.path))
            }) {
                continue;
            }
            let Some(module) = self.module_of(name) else {
                return Err(Self::failure(
                    format!("go get {}", references.join(" ")),
                    format!("go: module {name}: not found"),
                ));
            };
            if manifest.requirement(module).is_none() || version.is_some() {
                manifest.add_requirement(module, version.unwrap_or(FAKE_VERSION));
            }
        }
        manifest.save(&path)
    }

    fn locate(&self, dir: &Path, package: &str) -> Result<PathBuf> {
        let module = split_version(package).0;
        self.locates.borrow_mut().push(module.to_string());

        let manifest = Manifest::load(&dir.join(MANIFEST_NAME))?;
        if let Some(target) = manifest
            .redirects_of(module)
            .find_map(|r| r.new.directory())
        {
            return Ok(absolute(dir, Path::new(target)));
        }

        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| Self::failure(format!("go list -m {package}"), format!("module {module}: not a known dependency")))
    }

    fn current_owning_identity(&self, dir: &Path) -> Option<String> {
        if !self.report_owner {
            return None;
        }
        let path = self.current_manifest_location(dir)?;
        Manifest::load(&path).ok()?.identity().map(str::to_string)
    }

    fn edit_redirect(&self, dir: &Path, package: &str, target: &str) -> Result<()> {
        self.edits
            .borrow_mut()
            .push((package.to_string(), target.to_string()));

        let path = dir.join(MANIFEST_NAME);
        let mut manifest = Manifest::load(&path)?;
        let (old_path, old_version) = split_version(package);
        let new = if is_location(target) {
            RedirectTarget::Directory(target.to_string())
        } else {
            let (path, version) = split_version(target);
            RedirectTarget::Module {
                path: path.to_string(),
                version: version.unwrap_or(FAKE_VERSION).to_string(),
            }
        };
        manifest.set_redirect(old_path, old_version, new);
        manifest.save(&path)
    }
}
