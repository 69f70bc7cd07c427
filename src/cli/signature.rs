//! `autowire signature`: parse a declaration.

use super::check_format;
use crate::signature::extract;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Parse a callable declaration.
#[derive(Args, Debug)]
pub struct SignatureCommand {
    /// Declaration text, e.g. `fn render(template, retries = 3)`
    declaration: String,

    /// Output format (table, json)
    #[arg(short = 'f', long, default_value = "table")]
    format: String,
}

impl SignatureCommand {
    pub(super) fn execute(&self) -> Result<()> {
        check_format(&self.format)?;
        let signature = extract(&self.declaration)?;

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&signature)?);
            return Ok(());
        }

        println!("{} {} ({:?})", "callable:".bold(), signature.name.cyan(), signature.kind);
        if signature.parameters.is_empty() {
            println!("no parameters");
        }
        for (position, parameter) in signature.parameters.iter().enumerate() {
            match &parameter.default {
                Some(default) => println!("  {position}: {} = {default}", parameter.name),
                None => println!("  {position}: {}", parameter.name),
            }
        }
        Ok(())
    }
}
