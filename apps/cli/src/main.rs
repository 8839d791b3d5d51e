//! `unitdeploy`: inspect modules and upgrade settings from the command line.

mod config;
mod inspect;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "unitdeploy", version, about = "Unit code upgrade tooling")]
struct Cli {
    /// Upgrade configuration file. Defaults to the per-user config directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the module hash the unchanged-code check compares against.
    Hash {
        /// Compiled module file.
        module: PathBuf,
    },
    /// Show whether a module would be chunked, and how.
    Plan {
        /// Compiled module file.
        module: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Hash { module } => {
            let bytes = read_module(&module)?;
            println!("{}", inspect::module_hash(&bytes));
        }
        Command::Plan { module } => {
            let bytes = read_module(&module)?;
            print!("{}", inspect::render_plan(&bytes, &config)?);
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn read_module(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read module {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "module loaded");
    Ok(bytes)
}
