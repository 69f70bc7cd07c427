//! Dependency injection entry points.
//!
//! An [`Injector`] calls functions and builds instances with their parameters
//! filled in by name. For every parameter, in declaration order, the first of
//! these that yields something wins:
//!
//! 1. the caller's [`Overrides`]
//! 2. the parameter's literal default
//! 3. the registry, through the resolver and the instantiation policy (only
//!    with `autowire_modules` on)
//!
//! In safe mode (the default) a parameter left without a value aborts the call
//! with [`AutowireError::UnresolvedDependency`] and the target never runs. In
//! unsafe mode the slot is passed empty (see [`Arguments::is_missing`]).
//!
//! Overrides apply to the called target itself. With `deep_inject` they are
//! also applied to every component instantiated on the way, at any depth.
//!
//! # Example
//!
//! ```rust,no_run
//! use autowire::core::{Arguments, Function, Overrides};
//! use autowire::injector::Injector;
//! use autowire::registry::Registry;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(Registry::new("/srv/app"));
//! registry.wire("greeting", serde_json::json!("hello"));
//!
//! let injector = Injector::new(registry);
//! let greet = Function::returning("fn greet(greeting, name)", |args: &Arguments| {
//!     let greeting = args.require::<serde_json::Value>("greeting")?;
//!     let name = args.require::<&str>("name")?;
//!     Ok(format!("{} {}", greeting.as_str().unwrap_or_default(), name))
//! });
//!
//! let message = injector.inject(greet, &Overrides::new().with_value("name", "world"))?;
//! assert_eq!(message.downcast_ref::<String>().map(String::as_str), Some("hello world"));
//! # Ok(())
//! # }
//! ```

pub mod instantiate;

use crate::config::{AutowireConfig, CONFIG_FILE};
use crate::core::{
    Arguments, AutowireError, AutowireMeta, Class, Dependency, Function, Overrides, ResolutionContext,
};
use crate::registry::index::find_project_root;
use crate::registry::{Registry, RegistrySet};
use crate::resolver::Resolver;
use crate::signature::{self, Signature};
use instantiate::{Slot, Trail, construct, materialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Injection toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectOptions {
    /// Fail instead of passing nothing for an unresolved parameter
    pub safe: bool,
    /// Consult the registry for parameters
    pub autowire_modules: bool,
    /// Apply overrides to nested instantiations too
    pub deep_inject: bool,
    /// Tag produced values with a unique id
    pub add_autowire_id: bool,
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            safe: true,
            autowire_modules: true,
            deep_inject: false,
            add_autowire_id: false,
        }
    }
}

/// What [`Injector::get_instance`] should produce.
#[derive(Debug, Clone)]
pub enum Target {
    /// A logical name, resolved through the registry
    Name(String),
    /// A component given directly; resolution is skipped
    Component(Dependency),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Dependency> for Target {
    fn from(component: Dependency) -> Self {
        Self::Component(component)
    }
}

impl From<Function> for Target {
    fn from(function: Function) -> Self {
        Self::Component(function.into())
    }
}

impl From<Class> for Target {
    fn from(class: Class) -> Self {
        Self::Component(class.into())
    }
}

/// Calls functions and builds instances with injected arguments.
///
/// Cloning is cheap; clones share the registry.
#[derive(Debug, Clone)]
pub struct Injector {
    registry: Arc<Registry>,
    options: InjectOptions,
    context: ResolutionContext,
}

impl Injector {
    /// Injector over `registry` with default options, working from its root.
    pub fn new(registry: Arc<Registry>) -> Self {
        let context = ResolutionContext::for_dir(registry.root());
        Self {
            registry,
            options: InjectOptions::default(),
            context,
        }
    }

    /// Injector for the project enclosing `context`.
    ///
    /// Relative context paths are taken from the process working directory.
    /// The project root is the nearest ancestor holding `autowire.toml` or a
    /// `package.json`. Its registry is taken from `registries`; a new one is
    /// configured from the project's `autowire.toml`.
    pub fn bootstrap(registries: &RegistrySet, context: ResolutionContext) -> anyhow::Result<Self> {
        let context = context.absolute()?;
        let root = find_project_root(&context.current_dir, &[CONFIG_FILE, "package.json"]);
        let config = AutowireConfig::load(&root)?;
        let options = config.registry_options()?;
        let registry = registries.get_or_init(&root, || options, |registry| config.apply(registry))?;

        debug!("Injector for {} uses registry at {}", context.display_file(), registry.root().display());
        Ok(Self {
            registry,
            options: config.inject_options(),
            context,
        })
    }

    /// Replace the resolution context.
    #[must_use]
    pub fn with_context(mut self, context: ResolutionContext) -> Self {
        self.context = context;
        self
    }

    /// Replace all toggles.
    #[must_use]
    pub fn with_options(mut self, options: InjectOptions) -> Self {
        self.options = options;
        self
    }

    /// Copy with safe mode switched.
    #[must_use]
    pub fn with_safe(&self, safe: bool) -> Self {
        let mut injector = self.clone();
        injector.options.safe = safe;
        injector
    }

    /// Copy with deep injection switched.
    #[must_use]
    pub fn with_deep_inject(&self, deep_inject: bool) -> Self {
        let mut injector = self.clone();
        injector.options.deep_inject = deep_inject;
        injector
    }

    /// Copy with registry lookups switched.
    #[must_use]
    pub fn with_autowire_modules(&self, autowire_modules: bool) -> Self {
        let mut injector = self.clone();
        injector.options.autowire_modules = autowire_modules;
        injector
    }

    /// Copy with value tagging switched.
    #[must_use]
    pub fn with_autowire_id(&self, add_autowire_id: bool) -> Self {
        let mut injector = self.clone();
        injector.options.add_autowire_id = add_autowire_id;
        injector
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Current toggles.
    pub fn options(&self) -> InjectOptions {
        self.options
    }

    /// Current resolution context.
    pub fn context(&self) -> &ResolutionContext {
        &self.context
    }

    /// Index an extra directory; relative paths are taken from the context.
    pub fn add_import_path(&self, dir: impl Into<PathBuf>) {
        let dir = self.context.resolve_path(&dir.into());
        self.registry.add_import_path(dir);
    }

    /// Call `target` with its parameters injected.
    ///
    /// A function returns its result; a class returns a new [`Instance`]
    /// (never cached). Errors raised by the target itself pass through as-is.
    ///
    /// [`Instance`]: crate::core::Instance
    pub fn inject(&self, target: impl Into<Dependency>, overrides: &Overrides) -> anyhow::Result<Dependency> {
        let target = target.into();
        let signature = signature::of(&target)?;
        let args = self.resolve_arguments(&signature, overrides, &mut Trail::default())?;

        debug!("Invoking {} with {:?}", signature.name, args);
        match &target {
            Dependency::Function(function) => function.call(&args),
            _ => Ok(Dependency::Instance(Arc::new(construct(&target, &signature, &args)?))),
        }
    }

    /// Produce what a parameter called `target` would receive, or build a
    /// component given directly.
    ///
    /// A component given directly is always instantiated. Its own metadata
    /// still decides singleton caching, keyed by the component itself rather
    /// than its declared name, as well as mixins and proxy. `overrides` apply
    /// to the produced component's own parameters.
    pub fn get_instance(
        &self,
        target: impl Into<Target>,
        overrides: &Overrides,
    ) -> anyhow::Result<Option<Dependency>> {
        let mut trail = Trail::default();
        match target.into() {
            Target::Name(name) => {
                let produced = match Resolver::new(&self.registry).resolve(&name)? {
                    Some(candidate) => Some(materialize(
                        self,
                        Slot::Name(&candidate.key),
                        candidate.dependency,
                        candidate.meta.as_ref(),
                        overrides,
                        &mut trail,
                    )?),
                    None => None,
                };
                if produced.is_none() && self.options.safe {
                    return Err(self.unresolved(&name, "get_instance").into());
                }
                Ok(produced)
            }
            Target::Component(component) => {
                let signature = signature::of(&component)?;
                let meta = AutowireMeta {
                    instantiate: true,
                    ..component.meta().cloned().unwrap_or_default()
                };
                materialize(self, Slot::Component(&signature.name), component, Some(&meta), overrides, &mut trail)
                    .map(Some)
            }
        }
    }

    /// Resolve every parameter of `signature`, left to right.
    pub(crate) fn resolve_arguments(
        &self,
        signature: &Signature,
        overrides: &Overrides,
        trail: &mut Trail,
    ) -> anyhow::Result<Arguments> {
        let nested = if self.options.deep_inject {
            overrides.clone()
        } else {
            Overrides::new()
        };

        let mut args = Arguments::new();
        for parameter in &signature.parameters {
            let value = if let Some(value) = overrides.get(&parameter.name) {
                Some(value.clone())
            } else if let Some(default) = &parameter.default {
                Some(Dependency::json(default.clone()))
            } else if self.options.autowire_modules {
                self.provide(&parameter.name, &nested, trail)?
            } else {
                None
            };

            if value.is_none() {
                if self.options.safe {
                    return Err(self.unresolved(&parameter.name, &signature.name).into());
                }
                debug!("Passing nothing for '{}' of {}", parameter.name, signature.name);
            }
            args.push(parameter.name.clone(), value);
        }
        Ok(args)
    }

    fn provide(&self, name: &str, overrides: &Overrides, trail: &mut Trail) -> anyhow::Result<Option<Dependency>> {
        match Resolver::new(&self.registry).resolve(name)? {
            Some(candidate) => materialize(
                self,
                Slot::Name(&candidate.key),
                candidate.dependency,
                candidate.meta.as_ref(),
                overrides,
                trail,
            )
            .map(Some),
            None => Ok(None),
        }
    }

    fn unresolved(&self, parameter: &str, function: &str) -> AutowireError {
        AutowireError::UnresolvedDependency {
            parameter: parameter.to_string(),
            function: function.to_string(),
            file: self.context.display_file(),
            suggestion: self.registry.suggest(parameter),
        }
    }
}
