//! Explicit execution context for provisioning.
//!
//! Every operation that depends on "the current directory" reads it from a
//! [`Context`] instead of the process state, so the core can be exercised
//! against any directory without `chdir`.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::util::config::{global_config_path, load_config, project_config_path, Config, LinkMode};
use crate::util::fs::{absolute, clean_path};

/// Working directory and configuration for one provisioning call.
#[derive(Debug, Clone)]
pub struct Context {
    /// Caller working directory (absolute, cleaned)
    cwd: PathBuf,

    /// Merged configuration
    config: Config,
}

impl Context {
    /// Context for the process working directory, with global and project config.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Context for an absolute working directory, with global and project config.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let cwd = clean_path(&cwd);
        let config = load_config(global_config_path().as_deref(), &project_config_path(&cwd));
        Context { cwd, config }
    }

    /// Context for a working directory relative to `base`.
    pub fn with_cwd_from(base: &Path, dir: &Path) -> Self {
        Self::with_cwd(absolute(base, dir))
    }

    /// Context with an explicit configuration; no config files are read.
    pub fn with_config(cwd: PathBuf, config: Config) -> Self {
        Context {
            cwd: clean_path(&cwd),
            config,
        }
    }

    /// Get the caller working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory in which the ephemeral workspace root is allocated.
    pub fn temp_root(&self) -> PathBuf {
        match self.config.workspace.temp_root {
            Some(ref dir) => absolute(&self.cwd, dir),
            None => std::env::temp_dir(),
        }
    }

    /// How dependency trees are materialized.
    pub fn link_mode(&self) -> LinkMode {
        self.config.link_mode()
    }
}
