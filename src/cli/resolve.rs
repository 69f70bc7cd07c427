//! `autowire resolve`: trace how one name resolves.

use super::check_format;
use super::index::display_relative;
use crate::core::{AutowireError, Dependency};
use crate::injector::Injector;
use crate::resolver::Resolver;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;

/// Show how a single name resolves.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Logical name, e.g. `nodeUuid` or `pkg$lib$helper`
    name: String,

    /// Output format (table, json)
    #[arg(short = 'f', long, default_value = "table")]
    format: String,
}

impl ResolveCommand {
    pub(super) fn execute(&self, injector: &Injector) -> Result<()> {
        check_format(&self.format)?;
        let registry = injector.registry();
        let alias = registry.alias_target(&self.name);

        let Some(candidate) = Resolver::new(registry).resolve(&self.name)? else {
            let indexed = registry.lookup_index(alias.as_deref().unwrap_or(&self.name));
            if let Some(path) = indexed {
                anyhow::bail!(
                    "'{}' is indexed at {} but no module is registered for that file",
                    self.name,
                    display_relative(&path, registry.root())
                );
            }
            return Err(AutowireError::UnresolvedDependency {
                parameter: self.name.clone(),
                function: "resolve".to_string(),
                file: registry.root().display().to_string(),
                suggestion: registry.suggest(&self.name),
            }
            .into());
        };

        let value = candidate.dependency.downcast_ref::<serde_json::Value>().cloned();
        let path = registry
            .lookup_index(alias.as_deref().unwrap_or(&self.name))
            .map(|p| display_relative(&p, registry.root()));

        if self.format == "json" {
            let report = json!({
                "name": self.name,
                "alias_of": alias,
                "source": candidate.source,
                "kind": candidate.dependency.kind(),
                "path": path,
                "instantiate": candidate.meta.as_ref().is_some_and(|m| m.instantiate),
                "singleton": candidate.meta.as_ref().is_some_and(|m| m.singleton),
                "value": value,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{} {}", "name:".bold(), self.name.cyan());
        if let Some(target) = &alias {
            println!("{} {}", "alias of:".bold(), target);
        }
        println!("{} {}", "resolved via:".bold(), candidate.source.to_string().green());
        println!("{} {}", "kind:".bold(), describe(&candidate.dependency));
        if let Some(path) = path {
            println!("{} {}", "path:".bold(), path);
        }
        if let Some(meta) = &candidate.meta {
            println!(
                "{} instantiate={} singleton={} mixins={:?} proxy={}",
                "autowire:".bold(),
                meta.instantiate,
                meta.singleton,
                meta.mixins,
                meta.proxy.as_deref().unwrap_or("-")
            );
        }
        if let Some(value) = value {
            println!("{}\n{}", "value:".bold(), serde_json::to_string_pretty(&value)?);
        }
        Ok(())
    }
}

fn describe(dependency: &Dependency) -> String {
    match dependency {
        Dependency::Function(function) => format!("function `{}`", function.declaration()),
        Dependency::Class(class) => format!("class `{}`", class.declaration()),
        other => other.kind().to_string(),
    }
}
