//! overmod CLI - build Go packages against locally overridden dependencies

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod overrides;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("overmod=debug")
    } else {
        EnvFilter::new("overmod=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    let directory = cli.directory;
    match cli.command {
        Commands::Create(args) => commands::create::execute(directory.as_deref(), args),
        Commands::Exec(args) => commands::exec::execute(directory.as_deref(), args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
