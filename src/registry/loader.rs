//! Module loading.
//!
//! A [`ModuleLoader`] turns a package name or a file path into a
//! [`Dependency`]. It distinguishes three outcomes: loaded, not found
//! (`Ok(None)`), and found-but-broken (`Err`). Only the second is ever
//! negative-cached by the resolver.
//!
//! [`ModuleTable`] is the default loader. Components compiled into the host
//! are registered with it by name (builtins) or by the absolute path of the
//! file they live in (native modules); JSON and TOML data files are parsed
//! straight from disk.

use crate::core::Dependency;
use crate::registry::index::{IndexOptions, read_package_manifest};
use dashmap::DashMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, trace};

/// A module that exists but could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its content is invalid
    #[error("invalid content in {}: {reason}", .path.display())]
    Invalid {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

impl LoadError {
    /// The path that failed.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Invalid { path, .. } => path,
        }
    }
}

/// Outcome of a load attempt.
pub type LoadResult = std::result::Result<Option<Dependency>, LoadError>;

/// Host module system seen by the resolver.
pub trait ModuleLoader: Send + Sync {
    /// Import a package by bare name from the project at `root`.
    fn import_package(&self, name: &str, root: &Path, options: &IndexOptions) -> LoadResult;

    /// Import the module at `path`, trying the usual path permutations.
    fn import_path(&self, path: &Path, options: &IndexOptions) -> LoadResult;
}

/// Default [`ModuleLoader`].
#[derive(Default)]
pub struct ModuleTable {
    builtins: DashMap<String, Dependency>,
    natives: DashMap<PathBuf, Dependency>,
}

impl ModuleTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builtin module under `name`.
    pub fn register_builtin(&self, name: impl Into<String>, module: impl Into<Dependency>) {
        self.builtins.insert(name.into(), module.into());
    }

    /// Register a component as the module living at `path`.
    pub fn register_native(&self, path: impl Into<PathBuf>, module: impl Into<Dependency>) {
        self.natives.insert(path.into(), module.into());
    }

    /// Builder form of [`register_builtin`](Self::register_builtin).
    #[must_use]
    pub fn with_builtin(self, name: impl Into<String>, module: impl Into<Dependency>) -> Self {
        self.register_builtin(name, module);
        self
    }

    /// Builder form of [`register_native`](Self::register_native).
    #[must_use]
    pub fn with_native(self, path: impl Into<PathBuf>, module: impl Into<Dependency>) -> Self {
        self.register_native(path, module);
        self
    }

    /// Names of registered builtins, sorted.
    pub fn builtin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn load_candidate(&self, path: &Path) -> LoadResult {
        if let Some(module) = self.natives.get(path) {
            debug!("Loaded native module {}", path.display());
            return Ok(Some(module.clone()));
        }
        if !path.is_file() {
            return Ok(None);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => load_json(path).map(Some),
            Some("toml") => load_toml(path).map(Some),
            _ => {
                debug!("{} has no registered native module", path.display());
                Ok(None)
            }
        }
    }
}

impl ModuleLoader for ModuleTable {
    fn import_package(&self, name: &str, root: &Path, options: &IndexOptions) -> LoadResult {
        if let Some(module) = self.builtins.get(name) {
            debug!("Loaded builtin '{}'", name);
            return Ok(Some(module.clone()));
        }
        if !is_package_name(name) {
            return Ok(None);
        }

        let package_dir = root.join(&options.dependencies_dir).join(name);
        if !package_dir.is_dir() {
            return Ok(None);
        }

        let manifest_path = package_dir.join(&options.manifest_file);
        let main = if manifest_path.is_file() {
            read_package_manifest(&manifest_path)
                .map_err(|e| LoadError::Invalid {
                    path: manifest_path.clone(),
                    reason: e.to_string(),
                })?
                .main
        } else {
            None
        };

        if let Some(main) = main {
            if let Some(module) = self.import_path(&package_dir.join(main), options)? {
                return Ok(Some(module));
            }
        }
        self.import_path(&package_dir.join("index"), options)
    }

    fn import_path(&self, path: &Path, options: &IndexOptions) -> LoadResult {
        for candidate in path_permutations(path, options) {
            trace!("Trying {}", candidate.display());
            if let Some(module) = self.load_candidate(&candidate)? {
                return Ok(Some(module));
            }
        }
        Ok(None)
    }
}

/// Candidate files for `path`: exact, with each extension appended, then
/// `index` and `mod` files inside it as a directory.
pub fn path_permutations(path: &Path, options: &IndexOptions) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    for ext in &options.extensions {
        let mut with_ext = path.as_os_str().to_owned();
        with_ext.push(".");
        with_ext.push(ext);
        candidates.push(PathBuf::from(with_ext));
    }
    for stem in ["index", "mod"] {
        for ext in &options.extensions {
            candidates.push(path.join(format!("{stem}.{ext}")));
        }
    }
    candidates
}

// `lodash`, `node-uuid`, `@scope/pkg`
static PACKAGE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(@[A-Za-z0-9_.~-]+/)?[A-Za-z0-9_~-][A-Za-z0-9_.~-]*$").ok());

fn is_package_name(name: &str) -> bool {
    PACKAGE_NAME.as_ref().is_some_and(|re| re.is_match(name)) && !name.split('/').any(|part| part == "..")
}

fn read(path: &Path) -> std::result::Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json(path: &Path) -> std::result::Result<Dependency, LoadError> {
    let value: serde_json::Value = serde_json::from_str(&read(path)?).map_err(|e| LoadError::Invalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!("Loaded JSON module {}", path.display());
    Ok(Dependency::json(value))
}

fn load_toml(path: &Path) -> std::result::Result<Dependency, LoadError> {
    let invalid = |reason: String| LoadError::Invalid {
        path: path.to_path_buf(),
        reason,
    };
    let table: toml::Value = toml::from_str(&read(path)?).map_err(|e| invalid(e.to_string()))?;
    let value = serde_json::to_value(table).map_err(|e| invalid(e.to_string()))?;
    debug!("Loaded TOML module {}", path.display());
    Ok(Dependency::json(value))
}
