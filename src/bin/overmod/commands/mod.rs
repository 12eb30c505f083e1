//! Command implementations

pub mod completions;
pub mod create;
pub mod exec;

use std::path::Path;

use anyhow::{Context as _, Result};

use overmod::Context;

/// Context for the process working directory, or `directory` relative to it.
pub fn context(directory: Option<&Path>) -> Result<Context> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(match directory {
        Some(dir) => Context::with_cwd_from(&cwd, dir),
        None => Context::with_cwd(cwd),
    })
}
