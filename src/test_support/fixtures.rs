//! Test fixtures for common test scenarios.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixture for a module source tree, as found in a module cache.
#[derive(Debug, Clone)]
pub struct ModuleFixture {
    /// Module path.
    pub path: String,
    /// Files (path relative to module root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl ModuleFixture {
    /// Create a module fixture with only a manifest.
    pub fn new(path: impl Into<String>) -> Self {
        ModuleFixture {
            path: path.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write this fixture below `base`, in a directory named after the
    /// module path with `/` replaced by `_`.
    pub fn write_to(&self, base: &Path) -> std::io::Result<PathBuf> {
        let root = base.join(self.path.replace('/', "_"));
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("go.mod"), manifests::module(&self.path))?;

        for (rel_path, content) in &self.files {
            let full_path = root.join(rel_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }

        Ok(root)
    }
}

/// Common manifest templates.
pub mod manifests {
    /// A bare module manifest.
    pub fn module(path: &str) -> String {
        format!("module {path}\n\ngo 1.21\n")
    }

    /// A module manifest with requirements and replaces.
    pub fn with_requires(path: &str, requires: &[(&str, &str)], replaces: &[(&str, &str)]) -> String {
        let mut out = module(path);
        for (dep, version) in requires {
            out.push_str(&format!("\nrequire {dep} {version}\n"));
        }
        for (old, new) in replaces {
            out.push_str(&format!("\nreplace {old} => {new}\n"));
        }
        out
    }
}
