//! autowire CLI entry point
//!
//! Diagnostic front end for the autowire library:
//! - `index` - List the project's logical names
//! - `resolve` - Show how one name resolves
//! - `signature` - Parse a callable declaration

use anyhow::Result;
use autowire::cli;
use autowire::core::error::user_friendly_error;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute() {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
