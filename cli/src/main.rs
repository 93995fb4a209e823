mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{build, inspect, render, resolve};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `-v` raises the crate's level from `warn`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quadstore={level},quadstore_cli={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Inspect(args) => inspect::run(&cli, args),
        Commands::Resolve(args) => resolve::run(&cli, args),
        Commands::Render(args) => render::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
