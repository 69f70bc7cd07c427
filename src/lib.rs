//! autowire - dependency injection by parameter name
//!
//! autowire calls functions and builds objects whose parameters are filled in
//! from the project they live in. A parameter called `nodeUuid` receives the
//! module found at `node-uuid.json`, the installed package `nodeUuid`, or
//! whatever was wired under that name, without any registration code.
//!
//! # Architecture Overview
//!
//! ```text
//! Injector ──► Signature Extractor        parameter names from declarations
//!    │
//!    ├──────► Resolver ──► Registry        aliases, caches, wiring, index
//!    │                       └─► ModuleLoader   builtins, native modules, data files
//!    │
//!    └──────► Instantiation Policy         singletons, mixins, proxies
//! ```
//!
//! ## Core Modules
//!
//! - [`core`] - Components ([`core::Dependency`], [`core::Function`], [`core::Class`],
//!   [`core::Instance`]) and the error types
//! - [`signature`] - Reads ordered parameter names (and literal defaults) from a
//!   callable's declaration text
//! - [`registry`] - Per-project index, caches and wiring tables; module loading
//! - [`resolver`] - The name resolution pipeline
//! - [`injector`] - `inject` and `get_instance`, plus the instantiation policy
//! - [`config`] - `autowire.toml` project configuration
//! - [`cli`] - Diagnostic command-line front end
//!
//! # Example
//!
//! ```rust,no_run
//! use autowire::core::{Arguments, AutowireMeta, Class, Overrides, ResolutionContext};
//! use autowire::injector::Injector;
//! use autowire::registry::RegistrySet;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let registries = RegistrySet::default();
//! let injector = Injector::bootstrap(&registries, ResolutionContext::for_file("/srv/app/src/main.rs"))?;
//!
//! injector.registry().wire("databaseUrl", serde_json::json!("postgres://localhost/app"));
//! injector.registry().wire_class(
//!     "database",
//!     Class::new("impl Database { fn new(databaseUrl) }", |args: &Arguments| {
//!         let url = args.require::<serde_json::Value>("databaseUrl")?;
//!         Ok(Database { url: url.as_str().unwrap_or_default().to_string() })
//!     }),
//!     true,
//! )?;
//!
//! let db = injector.get_instance("database", &Overrides::new())?;
//! let url = db.as_ref().and_then(|db| db.downcast_ref::<Database>()).map(|db| db.url.clone());
//! assert_eq!(url.as_deref(), Some("postgres://localhost/app"));
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;
pub mod injector;
pub mod registry;
pub mod resolver;
pub mod signature;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
