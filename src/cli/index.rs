//! `autowire index`: print the project index.

use super::check_format;
use crate::injector::Injector;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

/// List the names the project index maps to files.
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Output format (table, json)
    #[arg(short = 'f', long, default_value = "table")]
    format: String,

    /// Only show names starting with this prefix
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Serialize)]
struct IndexEntry {
    name: String,
    path: String,
}

impl IndexCommand {
    pub(super) fn execute(&self, injector: &Injector) -> Result<()> {
        check_format(&self.format)?;
        let registry = injector.registry();
        registry.ensure_index();

        let entries: Vec<IndexEntry> = registry
            .indexed_names()
            .into_iter()
            .filter(|(name, _)| self.prefix.as_deref().is_none_or(|prefix| name.starts_with(prefix)))
            .map(|(name, path)| IndexEntry {
                name,
                path: display_relative(&path, registry.root()),
            })
            .collect();

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No indexed names under {}", registry.root().display());
            return Ok(());
        }

        let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        println!("{:width$}  {}", "NAME".bold(), "PATH".bold(), width = width);
        for entry in &entries {
            println!("{:width$}  {}", entry.name.cyan(), entry.path, width = width);
        }
        println!("\n{} names under {}", entries.len(), registry.root().display());
        Ok(())
    }
}

pub(super) fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
