//! Logical name resolution.
//!
//! The resolver turns a logical name (a parameter name, or a name passed to
//! `get_instance`) into a *candidate*: the raw component or value registered
//! for it, before any instantiation. It reads and fills the caches of one
//! [`Registry`]; it never builds instances itself (see [`crate::injector`]).
//!
//! # Resolution Pipeline
//!
//! Each step runs only if the previous ones produced nothing:
//!
//! 1. **Alias**: the name is redirected one step; the candidate is cached
//!    under both names and reports the target as its [`Candidate::key`]
//! 2. **Not-found set**: a name known to resolve to nothing returns at once
//! 3. **Module cache**: a previously resolved candidate is returned as-is
//! 4. **Wiring**: an explicit value, then an explicitly wired class
//! 5. **Package import**: builtins and installed packages, by bare name
//! 6. **Index**: the project index (built on first need) maps the name to a
//!    path, which is loaded with the usual path permutations
//! 7. **Submodules**: `pkg$lib$helper` loads `lib/helper` relative to the
//!    `pkg` package directory (or the directory of the indexed `pkg` file)
//! 8. **Not found**: the name joins the not-found set
//!
//! A module that exists but fails to load stops the pipeline with
//! [`AutowireError::ModuleLoad`]; such names are never negative-cached, so the
//! next attempt tries again.
//!
//! # Precedence
//!
//! Explicit value wiring beats a wired class, which beats anything discovered.
//! Mark-as-class entries do not change *what* is found, only how it is
//! materialized (see [`Registry::effective_meta`]).

use crate::core::{AutowireError, AutowireMeta, Dependency, Result};
use crate::registry::Registry;
use crate::registry::loader::LoadError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Step of the pipeline that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// Module cache hit
    Cache,
    /// Explicitly wired value
    Wired,
    /// Explicitly wired class
    WiredClass,
    /// Builtin or installed package
    Package,
    /// Project index
    Index,
    /// `$`-separated submodule path
    Submodule,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cache => "cache",
            Self::Wired => "wired",
            Self::WiredClass => "wired-class",
            Self::Package => "package",
            Self::Index => "index",
            Self::Submodule => "submodule",
        };
        f.write_str(label)
    }
}

/// A resolved, not yet materialized dependency.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Name the candidate is registered under once aliases are followed;
    /// singletons are cached under it
    pub key: String,
    /// The raw component or value
    pub dependency: Dependency,
    /// Instantiation metadata in effect for this name
    pub meta: Option<AutowireMeta>,
    /// Where it came from
    pub source: ResolutionSource,
}

/// Resolves logical names against one registry.
pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    /// Resolver reading `registry`.
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
        }
    }

    /// Resolve `name` to a candidate.
    ///
    /// `Ok(None)` means nothing is registered under the name; the result is
    /// remembered and later calls return it without touching the filesystem.
    pub fn resolve(&self, name: &str) -> Result<Option<Candidate>> {
        let target = self.registry.alias_target(name);
        let target = target.as_deref().unwrap_or(name);
        if target != name {
            debug!("'{}' is an alias of '{}'", name, target);
        }

        if self.registry.is_not_found(name) {
            debug!("'{}' is known to be missing", name);
            return Ok(None);
        }

        let cached = self.registry.cached(name).or_else(|| self.registry.cached(target));
        if let Some(dependency) = cached {
            debug!("'{}' resolved from cache", name);
            self.remember(name, target, &dependency);
            return Ok(Some(self.candidate(name, target, dependency, ResolutionSource::Cache)));
        }

        match self.discover(name, target)? {
            Some((dependency, source)) => {
                debug!("'{}' resolved via {} as a {}", name, source, dependency.kind());
                self.remember(name, target, &dependency);
                Ok(Some(self.candidate(name, target, dependency, source)))
            }
            None => {
                debug!("'{}' not found", name);
                self.registry.mark_not_found(name);
                Ok(None)
            }
        }
    }

    fn discover(&self, name: &str, target: &str) -> Result<Option<(Dependency, ResolutionSource)>> {
        let registry = self.registry;

        if let Some(value) = registry.wired(name).or_else(|| registry.wired(target)) {
            return Ok(Some((value, ResolutionSource::Wired)));
        }
        if let Some((class, _)) = registry.wired_class(name).or_else(|| registry.wired_class(target)) {
            return Ok(Some((class, ResolutionSource::WiredClass)));
        }

        let options = &registry.options().index;
        let package = registry
            .loader()
            .import_package(target, registry.root(), options)
            .map_err(|e| load_error(name, e))?;
        if let Some(module) = package {
            return Ok(Some((module, ResolutionSource::Package)));
        }

        registry.ensure_index();
        if let Some(path) = registry.lookup_index(target) {
            if let Some(module) = self.load_path(name, &path)? {
                return Ok(Some((module, ResolutionSource::Index)));
            }
        }

        let separator = registry.options().separator;
        if target.contains(separator) {
            if let Some(module) = self.resolve_submodule(name, target, separator)? {
                return Ok(Some((module, ResolutionSource::Submodule)));
            }
        }

        Ok(None)
    }

    fn resolve_submodule(&self, name: &str, target: &str, separator: char) -> Result<Option<Dependency>> {
        let mut segments = target.split(separator);
        let head = segments.next().unwrap_or_default();
        let rest: PathBuf = segments.filter(|s| !s.is_empty()).collect();
        if head.is_empty() || rest.as_os_str().is_empty() {
            return Ok(None);
        }

        let Some(base) = self.submodule_base(head) else {
            debug!("No package or module named '{}' for '{}'", head, target);
            return Ok(None);
        };
        debug!("'{}' decomposes to {}", target, base.join(&rest).display());
        self.load_path(name, &base.join(rest))
    }

    fn submodule_base(&self, head: &str) -> Option<PathBuf> {
        let registry = self.registry;
        if let Some(dir) = registry.package_root(head) {
            return Some(dir);
        }
        let installed = registry.root().join(&registry.options().index.dependencies_dir).join(head);
        if installed.is_dir() {
            return Some(installed);
        }
        registry.lookup_index(head).and_then(|path| path.parent().map(Path::to_path_buf))
    }

    fn load_path(&self, name: &str, path: &Path) -> Result<Option<Dependency>> {
        self.registry
            .loader()
            .import_path(path, &self.registry.options().index)
            .map_err(|e| load_error(name, e))
    }

    fn remember(&self, name: &str, target: &str, dependency: &Dependency) {
        self.registry.cache(name, dependency);
        if target != name {
            self.registry.cache(target, dependency);
        }
    }

    fn candidate(&self, name: &str, target: &str, dependency: Dependency, source: ResolutionSource) -> Candidate {
        let registry = self.registry;
        let key = if registry.wired_class(name).is_some() || registry.class_mark(name).is_some() {
            name
        } else {
            target
        };
        Candidate {
            key: key.to_string(),
            meta: registry.effective_meta(key, &dependency),
            dependency,
            source,
        }
    }
}

fn load_error(name: &str, error: LoadError) -> AutowireError {
    AutowireError::ModuleLoad {
        name: name.to_string(),
        path: error.path().display().to_string(),
        reason: error.to_string(),
    }
}
