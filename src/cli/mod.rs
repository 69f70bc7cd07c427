//! Command-line interface for autowire.
//!
//! The binary is a diagnostic companion to the library: it shows what a
//! project's index contains, how a single name resolves and how a
//! declaration is read.
//!
//! # Available Commands
//!
//! - `index` - List every logical name of the project and the file behind it
//! - `resolve` - Run the resolution pipeline for one name and report the step
//!   that answered
//! - `signature` - Parse a callable declaration and print its parameters
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: no log output (failures are still reported)
//! - `--path DIR`: project directory to inspect (default: current directory)
//!
//! `RUST_LOG` takes precedence over both verbosity flags.
//!
//! # Examples
//!
//! ```bash
//! autowire index
//! autowire --path ../service resolve nodeUuid
//! autowire signature 'impl Widget { fn new(fs, retries = 3) }' --format json
//! ```

mod index;
mod resolve;
mod signature;

use crate::core::ResolutionContext;
use crate::injector::Injector;
use crate::registry::RegistrySet;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use index::IndexCommand;
pub use resolve::ResolveCommand;
pub use signature::SignatureCommand;

/// Settings derived from global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is unset; `None` logs nothing
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, writing to stderr.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Root command.
#[derive(Parser, Debug)]
#[command(
    name = "autowire",
    about = "Inspect how autowire resolves dependencies in a project",
    version,
    long_about = "autowire injects dependencies by parameter name. This tool shows the project index, \
                  traces how a name resolves, and parses callable declarations."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the names the project index maps to files
    Index(IndexCommand),
    /// Show how a single name resolves
    Resolve(ResolveCommand),
    /// Parse a callable declaration
    Signature(SignatureCommand),
}

impl Cli {
    /// Run the parsed command.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    /// Translate global flags into a [`CliConfig`].
    ///
    /// `--quiet` installs no subscriber; command failures reach stderr
    /// through `main` regardless.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.quiet {
            None
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            Some("warn".to_string())
        };
        CliConfig {
            log_level,
        }
    }

    /// Run with an explicit configuration.
    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Index(cmd) => cmd.execute(&project_injector(self.path)?),
            Commands::Resolve(cmd) => cmd.execute(&project_injector(self.path)?),
            Commands::Signature(cmd) => cmd.execute(),
        }
    }
}

fn project_injector(path: Option<PathBuf>) -> Result<Injector> {
    let dir = match path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };
    if !dir.is_dir() {
        anyhow::bail!("Project directory {} does not exist", dir.display());
    }
    Injector::bootstrap(&RegistrySet::default(), ResolutionContext::for_dir(dir))
}

/// Reject anything but the supported output formats.
fn check_format(format: &str) -> Result<()> {
    match format {
        "table" | "json" => Ok(()),
        other => anyhow::bail!("Unknown output format '{other}' (expected 'table' or 'json')"),
    }
}
