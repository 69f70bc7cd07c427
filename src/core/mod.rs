//! Core types for autowire
//!
//! This module holds the vocabulary every other module speaks:
//!
//! - [`error`] - [`AutowireError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`component`] - [`Dependency`] and the callables ([`Function`], [`Class`])
//!   and products ([`Instance`]) it can hold, plus [`Arguments`] and [`Overrides`]
//! - [`context`] - [`ResolutionContext`], the directory and file an injector works from
//!
//! # Example
//!
//! ```rust
//! use autowire::core::{Dependency, Overrides};
//!
//! let overrides = Overrides::new()
//!     .with_value("retries", 3u32)
//!     .with("config", serde_json::json!({ "debug": true }));
//!
//! assert_eq!(overrides.get("retries").and_then(Dependency::downcast_ref::<u32>), Some(&3));
//! ```

pub mod component;
pub mod context;
pub mod error;

pub use component::{
    Arguments, AutowireMeta, AutowireTag, Class, Constructor, Dependency, Function, FunctionBody,
    Instance, Method, Overrides, Value,
};
pub use context::ResolutionContext;
pub use error::{AutowireError, ErrorContext, Result, user_friendly_error};
