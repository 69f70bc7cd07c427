//! Project configuration for autowire.
//!
//! Settings are read from `autowire.toml` at the project root; a missing file
//! means defaults. The `AUTOWIRE_CONFIG` environment variable points at a
//! different file instead.
//!
//! ```toml
//! safe = true
//! autowire_modules = true
//! deep_inject = false
//! add_autowire_id = false
//! separator = "$"
//! manifest_file = "package.json"
//! dependencies_dir = "node_modules"
//! extensions = ["rs", "json", "toml"]
//! ignore = ["target", "dist"]
//! import_paths = ["../shared", "~/components"]
//!
//! [aliases]
//! _ = "lodash"
//! u = "heavy-uuid-lib"
//!
//! [classes]
//! database = { singleton = true }
//! ```
//!
//! # Modules
//!
//! - `parser` - Generic TOML parsing with file context

pub mod parser;

pub use parser::parse_config;

use crate::core::{AutowireError, Result};
use crate::injector::InjectOptions;
use crate::registry::index::IndexOptions;
use crate::registry::{Registry, RegistryOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "autowire.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "AUTOWIRE_CONFIG";

/// Mark-as-class entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    /// Reuse the first instance
    pub singleton: bool,
}

/// Contents of `autowire.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutowireConfig {
    /// Refuse to call a function with an unresolved argument
    pub safe: bool,
    /// Resolve parameters through the registry at all
    pub autowire_modules: bool,
    /// Pass call overrides down to nested instantiations
    pub deep_inject: bool,
    /// Tag produced values with a unique id
    pub add_autowire_id: bool,
    /// Submodule separator (one character)
    pub separator: String,
    /// File marking project and package roots
    pub manifest_file: String,
    /// Installed-package directory
    pub dependencies_dir: String,
    /// Indexed extensions
    pub extensions: Vec<String>,
    /// Directory patterns left out of the index
    pub ignore: Vec<String>,
    /// Extra directories to index, relative to the project root
    pub import_paths: Vec<String>,
    /// Name redirections; values must be strings
    pub aliases: BTreeMap<String, toml::Value>,
    /// Names to instantiate whatever they resolve to
    pub classes: BTreeMap<String, ClassConfig>,
}

impl Default for AutowireConfig {
    fn default() -> Self {
        let index = IndexOptions::default();
        let inject = InjectOptions::default();
        Self {
            safe: inject.safe,
            autowire_modules: inject.autowire_modules,
            deep_inject: inject.deep_inject,
            add_autowire_id: inject.add_autowire_id,
            separator: crate::registry::DEFAULT_SEPARATOR.to_string(),
            manifest_file: index.manifest_file,
            dependencies_dir: index.dependencies_dir,
            extensions: index.extensions,
            ignore: Vec::new(),
            import_paths: Vec::new(),
            aliases: BTreeMap::new(),
            classes: BTreeMap::new(),
        }
    }
}

impl AutowireConfig {
    /// Load the configuration for the project at `root`.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let (path, explicit) = match std::env::var_os(CONFIG_ENV) {
            Some(path) => (PathBuf::from(path), true),
            None => (root.join(CONFIG_FILE), false),
        };

        if !path.is_file() {
            if explicit {
                return Err(AutowireError::config(format!(
                    "{CONFIG_ENV} points at {}, which does not exist",
                    path.display()
                ))
                .into());
            }
            debug!("No {} in {}; using defaults", CONFIG_FILE, root.display());
            return Ok(Self::default());
        }

        debug!("Loading configuration from {}", path.display());
        let config: Self = parse_config(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.separator()?;
        self.aliases()?;
        self.index_options()?;
        Ok(())
    }

    /// The separator as a character.
    pub fn separator(&self) -> Result<char> {
        let mut chars = self.separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(AutowireError::config(format!(
                "separator must be a single character, got '{}'",
                self.separator
            ))),
        }
    }

    /// Alias pairs, rejecting non-string targets.
    pub fn aliases(&self) -> Result<Vec<(String, String)>> {
        self.aliases
            .iter()
            .map(|(name, target)| match target {
                toml::Value::String(target) => Ok((name.clone(), target.clone())),
                other => Err(AutowireError::config(format!(
                    "alias '{name}' must map to a string, not a {}",
                    other.type_str()
                ))),
            })
            .collect()
    }

    /// Index settings.
    pub fn index_options(&self) -> Result<IndexOptions> {
        IndexOptions {
            manifest_file: self.manifest_file.clone(),
            dependencies_dir: self.dependencies_dir.clone(),
            extensions: self.extensions.clone(),
            ignore: Vec::new(),
        }
        .with_ignore_patterns(&self.ignore)
    }

    /// Registry settings.
    pub fn registry_options(&self) -> Result<RegistryOptions> {
        Ok(RegistryOptions {
            index: self.index_options()?,
            separator: self.separator()?,
        })
    }

    /// Injection toggles.
    pub fn inject_options(&self) -> InjectOptions {
        InjectOptions {
            safe: self.safe,
            autowire_modules: self.autowire_modules,
            deep_inject: self.deep_inject,
            add_autowire_id: self.add_autowire_id,
        }
    }

    /// Import directories: `~` expanded, relative ones joined to `root`.
    pub fn resolved_import_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.import_paths
            .iter()
            .map(|raw| {
                let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
                if path.is_absolute() { path } else { root.join(path) }
            })
            .collect()
    }

    /// Register aliases, class marks and import paths with `registry`.
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        for (name, target) in self.aliases()? {
            registry.alias(name, target)?;
        }
        for (name, class) in &self.classes {
            registry.mark_as_class(name.clone(), class.singleton);
        }
        for dir in self.resolved_import_paths(registry.root()) {
            registry.add_import_path(dir);
        }
        Ok(())
    }
}
