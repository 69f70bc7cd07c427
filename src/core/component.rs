//! Component model for autowire
//!
//! Everything the engine can hand to an injected callable is a [`Dependency`]:
//! a plain value, a [`Function`], a [`Class`], or an [`Instance`] produced by
//! instantiating one of the latter two.
//!
//! Callables carry a *declaration*, the signature text the engine reads
//! parameter names from, and a Rust closure body. The declaration is never
//! evaluated; it is only parsed (see [`crate::signature`]).
//!
//! # Examples
//!
//! ```rust
//! use autowire::core::{Arguments, AutowireMeta, Class, Dependency, Function};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let greeter = Class::new("impl Greeter { fn new(greeting = \"hello\") }", |args: &Arguments| {
//!     let greeting = args.require::<serde_json::Value>("greeting")?;
//!     Ok(Greeter { greeting: greeting.as_str().unwrap_or_default().to_string() })
//! })
//! .with_autowire(AutowireMeta::instantiate().singleton(true));
//!
//! let shout = Function::returning("fn shout(text)", |args: &Arguments| {
//!     Ok(args.require::<String>("text")?.to_uppercase())
//! });
//!
//! assert!(Dependency::from(greeter).is_callable());
//! assert!(Dependency::from(shout).is_callable());
//! ```

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Type-erased shared value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Body of a [`Function`].
pub type FunctionBody = dyn Fn(&Arguments) -> anyhow::Result<Dependency> + Send + Sync;

/// Constructor of a [`Class`]; produces the instance state.
pub type Constructor = dyn Fn(&Arguments) -> anyhow::Result<Value> + Send + Sync;

/// A method callable on an [`Instance`].
pub type Method = Arc<dyn Fn(&Instance, &Arguments) -> anyhow::Result<Dependency> + Send + Sync>;

/// Instantiation metadata attached to a callable.
///
/// A callable without metadata is handed out as-is. With `instantiate` set,
/// the engine resolves the callable's own parameters and builds an
/// [`Instance`] from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutowireMeta {
    /// Build an instance instead of returning the callable
    pub instantiate: bool,
    /// Cache the first instance and reuse it
    pub singleton: bool,
    /// Logical names of trait components composed into the instance
    pub mixins: Vec<String>,
    /// Logical name of a function wrapping the finished instance
    pub proxy: Option<String>,
}

impl AutowireMeta {
    /// Metadata requesting instantiation (transient unless changed).
    #[must_use]
    pub fn instantiate() -> Self {
        Self {
            instantiate: true,
            ..Self::default()
        }
    }

    /// Set the singleton flag.
    #[must_use]
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// Append a mixin name.
    #[must_use]
    pub fn mixin(mut self, name: impl Into<String>) -> Self {
        self.mixins.push(name.into());
        self
    }

    /// Set the proxy name.
    #[must_use]
    pub fn proxy(mut self, name: impl Into<String>) -> Self {
        self.proxy = Some(name.into());
        self
    }
}

/// Diagnostic tag attached to produced values when tagging is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutowireTag {
    /// Unique identifier generated at production time
    pub id: Uuid,
    /// Whether the tagged value is an instance built by the engine
    pub instance: bool,
}

impl AutowireTag {
    pub(crate) fn generate(instance: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance,
        }
    }
}

/// A plain function with a parsed-on-demand declaration.
pub struct Function {
    declaration: String,
    body: Box<FunctionBody>,
    meta: Option<AutowireMeta>,
}

impl Function {
    /// Create a function whose body returns a [`Dependency`].
    pub fn new<F>(declaration: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Arguments) -> anyhow::Result<Dependency> + Send + Sync + 'static,
    {
        Self {
            declaration: declaration.into(),
            body: Box::new(body),
            meta: None,
        }
    }

    /// Create a function whose body returns any value, wrapped as
    /// [`Dependency::Value`].
    pub fn returning<T, F>(declaration: impl Into<String>, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(declaration, move |args| body(args).map(Dependency::value))
    }

    /// Attach instantiation metadata.
    #[must_use]
    pub fn with_autowire(mut self, meta: AutowireMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The declaration text.
    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    /// Instantiation metadata, if any.
    pub fn meta(&self) -> Option<&AutowireMeta> {
        self.meta.as_ref()
    }

    /// Invoke the body with an assembled argument list.
    pub fn call(&self, args: &Arguments) -> anyhow::Result<Dependency> {
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("declaration", &self.declaration)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// A class: an `impl` declaration, a constructor and named methods.
pub struct Class {
    declaration: String,
    constructor: Box<Constructor>,
    methods: HashMap<String, Method>,
    meta: Option<AutowireMeta>,
}

impl Class {
    /// Create a class from its declaration and a typed constructor.
    pub fn new<T, F>(declaration: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            declaration: declaration.into(),
            constructor: Box::new(move |args: &Arguments| constructor(args).map(|state| Arc::new(state) as Value)),
            methods: HashMap::new(),
            meta: None,
        }
    }

    /// Register a method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Instance, &Arguments) -> anyhow::Result<Dependency> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    /// Attach instantiation metadata.
    #[must_use]
    pub fn with_autowire(mut self, meta: AutowireMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The declaration text.
    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    /// Instantiation metadata, if any.
    pub fn meta(&self) -> Option<&AutowireMeta> {
        self.meta.as_ref()
    }

    /// Run the constructor.
    pub fn construct(&self, args: &Arguments) -> anyhow::Result<Value> {
        (self.constructor)(args)
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Class")
            .field("declaration", &self.declaration)
            .field("methods", &methods)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// An object built by the engine from a [`Function`] or [`Class`].
///
/// Mixins are held by composition. Method lookup checks the instance's own
/// class first, then each mixin in declaration order; the first match wins.
pub struct Instance {
    class_name: String,
    origin: Dependency,
    state: Value,
    mixins: Vec<(String, Arc<Instance>)>,
    tag: Option<AutowireTag>,
}

impl Instance {
    pub(crate) fn new(class_name: impl Into<String>, origin: Dependency, state: Value) -> Self {
        Self {
            class_name: class_name.into(),
            origin,
            state,
            mixins: Vec::new(),
            tag: None,
        }
    }

    pub(crate) fn push_mixin(&mut self, name: impl Into<String>, mixin: Arc<Instance>) {
        self.mixins.push((name.into(), mixin));
    }

    pub(crate) fn set_tag(&mut self, tag: AutowireTag) {
        self.tag = Some(tag);
    }

    /// Name of the class or function this instance was built from.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The component this instance was built from.
    pub fn origin(&self) -> &Dependency {
        &self.origin
    }

    /// Typed access to the constructed state.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    /// Whether this instance was built from `component`.
    pub fn is_instance_of(&self, component: &Dependency) -> bool {
        self.origin.ptr_eq(component)
    }

    /// Composed mixin instances in declaration order.
    pub fn mixins(&self) -> impl Iterator<Item = (&str, &Arc<Instance>)> {
        self.mixins.iter().map(|(name, instance)| (name.as_str(), instance))
    }

    /// Typed access to the state of the first mixin holding a `T`.
    pub fn mixin<T: Any>(&self) -> Option<&T> {
        self.mixins.iter().find_map(|(_, mixin)| mixin.state::<T>())
    }

    /// Diagnostic tag, present when tagging was enabled.
    pub fn tag(&self) -> Option<&AutowireTag> {
        self.tag.as_ref()
    }

    /// Whether `method` is reachable on this instance or one of its mixins.
    pub fn responds_to(&self, method: &str) -> bool {
        self.own_method(method).is_some()
            || self.mixins.iter().any(|(_, mixin)| mixin.responds_to(method))
    }

    /// Call a method by name.
    ///
    /// A mixin method runs against the mixin instance that provides it.
    pub fn call(&self, method: &str, args: &Arguments) -> anyhow::Result<Dependency> {
        if let Some(body) = self.own_method(method) {
            return body(self, args);
        }
        for (_, mixin) in &self.mixins {
            if mixin.responds_to(method) {
                return mixin.call(method, args);
            }
        }
        anyhow::bail!("'{}' has no method '{}'", self.class_name, method)
    }

    fn own_method(&self, method: &str) -> Option<&Method> {
        match &self.origin {
            Dependency::Class(class) => class.find_method(method),
            _ => None,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mixins: Vec<&str> = self.mixins.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Instance")
            .field("class_name", &self.class_name)
            .field("mixins", &mixins)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Anything that can be injected.
#[derive(Clone)]
pub enum Dependency {
    /// Plain value
    Value(Value),
    /// Function reference
    Function(Arc<Function>),
    /// Class reference
    Class(Arc<Class>),
    /// Instance built by the engine
    Instance(Arc<Instance>),
}

impl Dependency {
    /// Wrap any value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    /// Wrap a JSON value; literal defaults and data modules use this form.
    pub fn json(value: serde_json::Value) -> Self {
        Self::value(value)
    }

    /// Reference identity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Arc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address of the shared allocation; stable while any clone is alive.
    pub(crate) fn addr(&self) -> usize {
        match self {
            Self::Value(a) => Arc::as_ptr(a) as *const () as usize,
            Self::Function(a) => Arc::as_ptr(a) as *const () as usize,
            Self::Class(a) => Arc::as_ptr(a) as *const () as usize,
            Self::Instance(a) => Arc::as_ptr(a) as *const () as usize,
        }
    }

    /// Functions and classes are callable.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Class(_))
    }

    /// Typed access to a plain value or to an instance's state.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Value(value) => value.downcast_ref::<T>(),
            Self::Instance(instance) => instance.state::<T>(),
            _ => None,
        }
    }

    /// The function, if this is one.
    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    /// The class, if this is one.
    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The instance, if this is one.
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Instantiation metadata of a callable.
    pub fn meta(&self) -> Option<&AutowireMeta> {
        match self {
            Self::Function(function) => function.meta(),
            Self::Class(class) => class.meta(),
            _ => None,
        }
    }

    /// Short kind label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Function(_) => "function",
            Self::Class(_) => "class",
            Self::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => match value.downcast_ref::<serde_json::Value>() {
                Some(json) => write!(f, "Value({json})"),
                None => f.write_str("Value(..)"),
            },
            Self::Function(function) => fmt::Debug::fmt(function, f),
            Self::Class(class) => fmt::Debug::fmt(class, f),
            Self::Instance(instance) => fmt::Debug::fmt(instance, f),
        }
    }
}

impl From<Function> for Dependency {
    fn from(function: Function) -> Self {
        Self::Function(Arc::new(function))
    }
}

impl From<Class> for Dependency {
    fn from(class: Class) -> Self {
        Self::Class(Arc::new(class))
    }
}

impl From<serde_json::Value> for Dependency {
    fn from(value: serde_json::Value) -> Self {
        Self::json(value)
    }
}

/// Positional arguments with their parameter names.
#[derive(Clone, Default)]
pub struct Arguments {
    entries: Vec<(String, Option<Dependency>)>,
}

impl Arguments {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unnamed values; names are their positions.
    pub fn positional(values: impl IntoIterator<Item = Dependency>) -> Self {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (i.to_string(), Some(value)))
                .collect(),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Option<Dependency>) {
        self.entries.push((name.into(), value));
    }

    pub(crate) fn prepend(mut self, name: impl Into<String>, value: Dependency) -> Self {
        self.entries.insert(0, (name.into(), Some(value)));
        self
    }

    /// Number of slots, including unresolved ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Argument by parameter name; `None` for unknown or unresolved slots.
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.iter().find(|(n, _)| n == name).and_then(|(_, value)| value.as_ref())
    }

    /// Argument by position.
    pub fn at(&self, index: usize) -> Option<&Dependency> {
        self.entries.get(index).and_then(|(_, value)| value.as_ref())
    }

    /// Typed argument by name.
    pub fn value<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Dependency::downcast_ref::<T>)
    }

    /// Typed argument by name, failing when missing or of another type.
    pub fn require<T: Any>(&self, name: &str) -> anyhow::Result<&T> {
        match self.get(name) {
            Some(dependency) => dependency.downcast_ref::<T>().ok_or_else(|| {
                anyhow::anyhow!(
                    "argument '{}' is a {} of another type than {}",
                    name,
                    dependency.kind(),
                    std::any::type_name::<T>()
                )
            }),
            None => anyhow::bail!("argument '{name}' is not available"),
        }
    }

    /// Whether the slot exists but holds nothing (unsafe-mode injection).
    pub fn is_missing(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, value)| n == name && value.is_none())
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(n, v)| (n, v))).finish()
    }
}

/// Caller-supplied values that take priority over any discovery.
#[derive(Clone, Default)]
pub struct Overrides {
    values: HashMap<String, Dependency>,
}

impl Overrides {
    /// Empty override map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, dependency: impl Into<Dependency>) -> Self {
        self.values.insert(name.into(), dependency.into());
        self
    }

    /// Add a plain value.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
        self.with(name, Dependency::value(value))
    }

    /// Insert in place.
    pub fn insert(&mut self, name: impl Into<String>, dependency: Dependency) {
        self.values.insert(name.into(), dependency);
    }

    /// Look up an override.
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.values.get(name)
    }

    /// Whether no overrides are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl FromIterator<(String, Dependency)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (String, Dependency)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Overrides").field("names", &names).finish()
    }
}
