//! The `go` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::util::context::Context;
use crate::util::errors::{Error, Result};
use crate::util::process::{find_executable, ProcessBuilder};

use super::Toolchain;

/// Values `go list -m -f {{.GoMod}}` prints when no real manifest applies.
const NO_MANIFEST_MARKERS: &[&str] = &["", "/dev/null", "NUL"];

/// Toolchain backed by the `go` executable.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    /// Path to the `go` executable
    program: PathBuf,

    /// Extra environment for every invocation
    env: BTreeMap<String, String>,
}

impl GoToolchain {
    /// Create a toolchain for an explicit program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        GoToolchain {
            program: program.into(),
            env: BTreeMap::new(),
        }
    }

    /// Create a toolchain from configuration.
    ///
    /// A bare program name is looked up in PATH; if it cannot be found it is
    /// used as-is so that the eventual spawn failure names it.
    pub fn from_context(ctx: &Context) -> Self {
        let configured = ctx.config().go_program();
        let program = if configured.components().count() == 1 {
            find_executable(&configured.to_string_lossy()).unwrap_or(configured)
        } else {
            configured
        };

        ctx.config()
            .go
            .env
            .iter()
            .fold(GoToolchain::new(program), |go, (key, value)| {
                go.with_env(key.as_str(), value.as_str())
            })
    }

    /// Add an environment variable for every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// A `go` invocation in `dir` with the configured environment.
    pub fn command(&self, dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).envs(&self.env).cwd(dir)
    }

    /// Run and return trimmed stdout.
    fn output(&self, cmd: ProcessBuilder) -> Result<String> {
        let output = cmd.exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// First non-empty line of `go list -m` output; workspaces list several modules.
fn first_line(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

impl Toolchain for GoToolchain {
    fn init_manifest(&self, dir: &Path, identity: &str) -> Result<()> {
        self.command(dir)
            .args(["mod", "init", identity])
            .exec_and_check()?;
        Ok(())
    }

    fn current_manifest_location(&self, cwd: &Path) -> Option<PathBuf> {
        let cmd = self.command(cwd).args(["list", "-m", "-f", "{{.GoMod}}"]);
        match self.output(cmd) {
            Ok(out) => {
                let path = first_line(&out);
                if NO_MANIFEST_MARKERS.contains(&path) {
                    None
                } else {
                    Some(PathBuf::from(path))
                }
            }
            Err(e) => {
                tracing::debug!("no governing manifest for {}: {}", cwd.display(), e);
                None
            }
        }
    }

    fn fetch(&self, dir: &Path, references: &[String]) -> Result<()> {
        if references.is_empty() {
            return Ok(());
        }
        self.command(dir)
            .arg("get")
            .args(references)
            .exec_and_check()?;
        Ok(())
    }

    fn locate(&self, dir: &Path, package: &str) -> Result<PathBuf> {
        let cmd = self
            .command(dir)
            .args(["list", "-m", "-f", "{{.Dir}}", package]);
        let out = self.output(cmd)?;
        let located = first_line(&out);
        if located.is_empty() {
            return Err(Error::resolution(
                package,
                "the toolchain reports no source directory (is the module downloaded?)",
            ));
        }
        Ok(PathBuf::from(located))
    }

    fn current_owning_identity(&self, dir: &Path) -> Option<String> {
        let cmd = self.command(dir).args(["list", "-m", "-f", "{{.Path}}"]);
        match self.output(cmd) {
            Ok(out) => Some(first_line(&out).to_string()).filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::debug!("no owning package for {}: {}", dir.display(), e);
                None
            }
        }
    }

    fn edit_redirect(&self, dir: &Path, package: &str, target: &str) -> Result<()> {
        // one argv element, so spaces in `target` need no quoting
        self.command(dir)
            .args(["mod", "edit"])
            .arg(format!("-replace={package}={target}"))
            .exec_and_check()?;
        Ok(())
    }
}
