//! `overmod exec` command
//!
//! Provisions a workspace, runs `go <subcommand> <entries> <args>` inside
//! it and removes it again.

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::ExecArgs;
use crate::commands::context;
use crate::overrides::load_request;
use overmod::ops::create_environment;
use overmod::GoToolchain;

pub fn execute(directory: Option<&Path>, args: ExecArgs) -> Result<()> {
    let ctx = context(directory)?;
    let request = load_request(ctx.cwd(), &args.input, &args.entries)?;
    let go = GoToolchain::from_context(&ctx);

    let env = match create_environment(&ctx, &go, &request.entries, &request.overrides) {
        Ok(env) => env,
        Err(e) => {
            if let Some(ref root) = e.root {
                cleanup(root, args.keep);
            }
            return Err(e.source.into());
        }
    };

    let result = go
        .command(&env.root)
        .arg(&args.subcommand)
        .args(&env.entries)
        .args(&args.args)
        .status();
    cleanup(&env.root, args.keep);

    let status = result.context("failed to run go")?;
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

fn cleanup(root: &Path, keep: bool) {
    if keep {
        tracing::info!("keeping workspace {}", root.display());
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(root) {
        tracing::warn!("failed to remove workspace {}: {}", root.display(), e);
    }
}
