//! Configuration file support for overmod.
//!
//! Two configuration file locations are consulted:
//! - Global: `~/.overmod/config.toml` - User-wide defaults
//! - Project: `.overmod/config.toml` - Overrides for one working directory
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the Go executable; wins over config files.
pub const GO_PROGRAM_ENV: &str = "OVERMOD_GO";

/// overmod configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Go toolchain settings
    pub go: GoConfig,

    /// Workspace provisioning settings
    pub workspace: WorkspaceConfig,
}

/// Go toolchain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Path or name of the `go` executable
    pub program: Option<PathBuf>,

    /// Extra environment variables for every toolchain invocation
    pub env: BTreeMap<String, String>,
}

/// Workspace provisioning settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory in which ephemeral workspaces are allocated
    pub temp_root: Option<PathBuf>,

    /// How dependency trees are materialized
    pub link_mode: Option<LinkMode>,
}

/// How files of a dependency tree are materialized in the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Hard-link files, copying when linking fails
    #[default]
    Hardlink,
    /// Always copy file contents
    Copy,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.go.program.is_some() {
            self.go.program = other.go.program;
        }
        // env tables are merged key by key
        self.go.env.extend(other.go.env);

        if other.workspace.temp_root.is_some() {
            self.workspace.temp_root = other.workspace.temp_root;
        }
        if other.workspace.link_mode.is_some() {
            self.workspace.link_mode = other.workspace.link_mode;
        }
    }

    /// The Go executable: `OVERMOD_GO`, then config, then `go`.
    pub fn go_program(&self) -> PathBuf {
        std::env::var_os(GO_PROGRAM_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.go.program.clone())
            .unwrap_or_else(|| PathBuf::from("go"))
    }

    /// The configured link mode.
    pub fn link_mode(&self) -> LinkMode {
        self.workspace.link_mode.unwrap_or_default()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.overmod/config.toml)
/// 2. Global config (~/.overmod/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global overmod config directory (~/.overmod).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".overmod"))
}

/// Get the global config path (~/.overmod/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.overmod/config.toml).
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".overmod").join("config.toml")
}
