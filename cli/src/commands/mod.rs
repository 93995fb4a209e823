pub mod build;
pub mod inspect;
pub mod render;
pub mod resolve;

use anyhow::{Context, Result};
use quadstore::Config;

/// The configuration file named on the command line, or defaults.
pub fn load_config(cli: &crate::cli::Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("[cmd] loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}
