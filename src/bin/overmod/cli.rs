//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// overmod - ephemeral Go workspaces with overridden dependency files
#[derive(Parser)]
#[command(name = "overmod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision a workspace and print where it is
    Create(CreateArgs),

    /// Provision a workspace, run a go command in it, then remove it
    Exec(ExecArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by every provisioning command.
#[derive(Args, Debug, Clone)]
pub struct OverrideArgs {
    /// TOML file listing entries and overrides
    #[arg(short = 'o', long = "overrides", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Override one file: PACKAGE:PATH=SOURCE_FILE
    #[arg(long = "override", value_name = "PKG:PATH=SRC")]
    pub overrides: Vec<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub input: OverrideArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Packages to build (defaults to the current directory)
    pub entries: Vec<String>,
}

#[derive(Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub input: OverrideArgs,

    /// Keep the workspace after the command finishes
    #[arg(long)]
    pub keep: bool,

    /// go subcommand to run (build, test, vet, ...)
    pub subcommand: String,

    /// Packages to pass to the subcommand (defaults to the current directory)
    pub entries: Vec<String>,

    /// Extra arguments passed after the entries
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
