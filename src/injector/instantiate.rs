//! Instantiation policy: turning a resolved candidate into what gets injected.
//!
//! - plain values, instances and callables without `instantiate` metadata are
//!   handed out unchanged
//! - otherwise the callable's own parameters are resolved, it is run (a class
//!   through its constructor) and the result wrapped in an [`Instance`]
//! - declared mixins are materialized and composed into the instance in order
//! - a declared proxy receives the finished instance and its return value
//!   replaces it
//! - singletons are cached once fully built: per logical name (aliases
//!   followed) for resolved candidates, per component identity for components
//!   handed to `get_instance` directly

use super::Injector;
use crate::core::{
    Arguments, AutowireError, AutowireMeta, AutowireTag, Dependency, Instance, Overrides, Value,
};
use crate::resolver::Resolver;
use crate::signature::{self, Signature};
use std::sync::Arc;
use tracing::debug;

/// Names currently being instantiated, outermost first.
#[derive(Debug, Default)]
pub(crate) struct Trail {
    names: Vec<String>,
}

impl Trail {
    fn enter(&mut self, name: &str) -> crate::core::Result<()> {
        if self.names.iter().any(|n| n == name) {
            let mut chain = self.names.clone();
            chain.push(name.to_string());
            return Err(AutowireError::CircularDependency {
                chain: chain.join(" -> "),
            });
        }
        self.names.push(name.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.names.pop();
    }
}

/// Where a singleton lives.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'a> {
    /// A resolved candidate, by its key
    Name(&'a str),
    /// A component given directly, by identity; the name is for diagnostics
    Component(&'a str),
}

impl Slot<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Component(name) => name,
        }
    }
}

/// Materialize `dependency`.
pub(crate) fn materialize(
    injector: &Injector,
    slot: Slot<'_>,
    dependency: Dependency,
    meta: Option<&AutowireMeta>,
    overrides: &Overrides,
    trail: &mut Trail,
) -> anyhow::Result<Dependency> {
    let name = slot.name();
    let meta = match meta {
        Some(meta) if meta.instantiate && dependency.is_callable() => meta,
        _ => {
            tag_value(injector, name, &dependency);
            return Ok(dependency);
        }
    };

    let registry = injector.registry();
    if meta.singleton {
        let existing = match slot {
            Slot::Name(key) => registry.singleton(key),
            Slot::Component(_) => registry.component_singleton(&dependency),
        };
        if let Some(existing) = existing {
            debug!("Reusing singleton '{}'", name);
            return Ok(existing);
        }
    }

    trail.enter(name)?;
    let built = build(injector, name, &dependency, meta, overrides, trail);
    trail.leave();
    let built = built?;

    if meta.singleton {
        match slot {
            Slot::Name(key) => registry.store_singleton(key, &built),
            Slot::Component(_) => registry.store_component_singleton(&dependency, &built),
        }
    }
    Ok(built)
}

fn build(
    injector: &Injector,
    name: &str,
    dependency: &Dependency,
    meta: &AutowireMeta,
    overrides: &Overrides,
    trail: &mut Trail,
) -> anyhow::Result<Dependency> {
    let signature = signature::of(dependency)?;
    let args = injector.resolve_arguments(&signature, overrides, trail)?;
    debug!("Instantiating '{}' from {}", name, signature.name);
    let mut instance = construct(dependency, &signature, &args)?;

    for mixin in &meta.mixins {
        let composed = compose(injector, name, mixin, overrides, trail)?;
        instance.push_mixin(mixin.clone(), composed);
    }

    if injector.options().add_autowire_id {
        instance.set_tag(AutowireTag::generate(true));
    }

    let instance = Dependency::Instance(Arc::new(instance));
    match &meta.proxy {
        Some(proxy) => apply_proxy(injector, name, proxy, instance, overrides, trail),
        None => Ok(instance),
    }
}

/// Run a callable and wrap its product in an [`Instance`].
pub(crate) fn construct(
    dependency: &Dependency,
    signature: &Signature,
    args: &Arguments,
) -> anyhow::Result<Instance> {
    let state: Value = match dependency {
        Dependency::Function(function) => match function.call(args)? {
            Dependency::Value(value) => value,
            other => Arc::new(other),
        },
        Dependency::Class(class) => class.construct(args)?,
        other => {
            return Err(AutowireError::parse(&signature.name, format!("a {} cannot be instantiated", other.kind()))
                .into());
        }
    };
    Ok(Instance::new(signature.name.clone(), dependency.clone(), state))
}

fn compose(
    injector: &Injector,
    target: &str,
    mixin: &str,
    overrides: &Overrides,
    trail: &mut Trail,
) -> anyhow::Result<Arc<Instance>> {
    let unresolved = || AutowireError::MixinResolution {
        mixin: mixin.to_string(),
        target: target.to_string(),
    };

    let Some(candidate) = Resolver::new(injector.registry()).resolve(mixin)? else {
        return Err(unresolved().into());
    };
    if let Dependency::Instance(instance) = &candidate.dependency {
        return Ok(Arc::clone(instance));
    }
    if !candidate.dependency.is_callable() {
        return Err(unresolved().into());
    }

    let meta = AutowireMeta {
        instantiate: true,
        ..candidate.meta.unwrap_or_default()
    };
    let key = candidate.key.clone();
    match materialize(injector, Slot::Name(&key), candidate.dependency, Some(&meta), overrides, trail)? {
        Dependency::Instance(instance) => Ok(instance),
        _ => Err(unresolved().into()),
    }
}

fn apply_proxy(
    injector: &Injector,
    target: &str,
    proxy: &str,
    instance: Dependency,
    overrides: &Overrides,
    trail: &mut Trail,
) -> anyhow::Result<Dependency> {
    let failure = |reason: String| AutowireError::ProxyResolution {
        proxy: proxy.to_string(),
        target: target.to_string(),
        reason,
    };

    let Some(candidate) = Resolver::new(injector.registry()).resolve(proxy)? else {
        return Err(failure("nothing is registered under that name".to_string()).into());
    };
    let function = match &candidate.dependency {
        Dependency::Function(function) => Arc::clone(function),
        other => return Err(failure(format!("a {} is not a function", other.kind())).into()),
    };

    let signature = signature::extract(function.declaration())?;
    let Some((first, rest)) = signature.parameters.split_first() else {
        return Err(failure("it takes no parameter to receive the instance".to_string()).into());
    };
    let remaining = Signature {
        parameters: rest.to_vec(),
        ..signature.clone()
    };

    debug!("Proxying '{}' through '{}'", target, proxy);
    let args = injector.resolve_arguments(&remaining, overrides, trail)?.prepend(first.name.clone(), instance);
    function.call(&args)
}

fn tag_value(injector: &Injector, name: &str, dependency: &Dependency) {
    if injector.options().add_autowire_id && !matches!(dependency, Dependency::Instance(_)) {
        injector.registry().record_tag(name, AutowireTag::generate(false));
    }
}
