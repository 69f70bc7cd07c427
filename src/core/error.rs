//! Error handling for autowire
//!
//! This module provides the error types raised while extracting signatures,
//! resolving logical names and instantiating components, together with the
//! user-friendly reporting used by the command-line front end.
//!
//! # Architecture
//!
//! - [`AutowireError`] - Enumerated error types for every failure the engine reports
//! - [`ErrorContext`] - Wrapper that adds user-facing details and suggestions
//!
//! # Error Categories
//!
//! - **Declarations**: [`AutowireError::Parse`]
//! - **Configuration**: [`AutowireError::Config`]
//! - **Resolution**: [`AutowireError::UnresolvedDependency`],
//!   [`AutowireError::CircularDependency`]
//! - **Loading**: [`AutowireError::ModuleLoad`]
//! - **Composition**: [`AutowireError::MixinResolution`], [`AutowireError::ProxyResolution`]
//!
//! # Propagation
//!
//! Registry and resolver internals return [`Result`]. The injection surface
//! returns [`anyhow::Result`] so that an error raised by an injected callable
//! reaches the caller untouched; engine errors are recovered from it with
//! `downcast_ref::<AutowireError>()`.
//!
//! ```rust,no_run
//! use autowire::core::{AutowireError, user_friendly_error};
//!
//! let error = anyhow::Error::from(AutowireError::UnresolvedDependency {
//!     parameter: "TestModule".to_string(),
//!     function: "main".to_string(),
//!     file: "src/main.rs".to_string(),
//!     suggestion: None,
//! });
//!
//! if let Some(AutowireError::UnresolvedDependency { parameter, .. }) =
//!     error.downcast_ref::<AutowireError>()
//! {
//!     assert_eq!(parameter, "TestModule");
//! }
//!
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Convenience alias for results produced by the engine internals.
pub type Result<T> = std::result::Result<T, AutowireError>;

/// The main error type for autowire operations.
///
/// Only a genuine "not found" outcome is ever absorbed by the engine (into the
/// negative cache). Every variant below is fatal for the operation that raised
/// it and is surfaced synchronously.
#[derive(Error, Debug)]
pub enum AutowireError {
    /// A callable declaration could not be parsed
    ///
    /// Raised when a declaration is not a recognizable function, closure or
    /// `impl` block, or when an `impl` block declares more than one `new`
    /// constructor.
    #[error("Cannot parse declaration of '{callable}': {reason}")]
    Parse {
        /// Name of the callable, or the sentinel name for anonymous ones
        callable: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid configuration was supplied
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// A required parameter could not be resolved in safe mode
    ///
    /// The target callable is never invoked when this error is raised.
    #[error("Cannot resolve dependency '{parameter}' of '{function}' (in {file})")]
    UnresolvedDependency {
        /// Parameter (logical name) that resolved to nothing
        parameter: String,
        /// Enclosing callable
        function: String,
        /// File of the resolution context
        file: String,
        /// Closest indexed name, if any looks like a typo
        suggestion: Option<String>,
    },

    /// A module exists but failed to load
    ///
    /// Never recorded in the negative cache.
    #[error("Failed to load module '{name}' from {path}: {reason}")]
    ModuleLoad {
        /// Logical name being resolved
        name: String,
        /// Path or package name that failed
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// A declared mixin could not be resolved
    #[error("Cannot resolve mixin '{mixin}' declared by '{target}'")]
    MixinResolution {
        /// Mixin logical name
        mixin: String,
        /// Component that declared it
        target: String,
    },

    /// A declared proxy could not be resolved or is not callable
    #[error("Cannot resolve proxy '{proxy}' declared by '{target}': {reason}")]
    ProxyResolution {
        /// Proxy logical name
        proxy: String,
        /// Component that declared it
        target: String,
        /// Why the proxy is unusable
        reason: String,
    },

    /// Recursive instantiation revisited a name already being built
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// The chain of names, joined with arrows
        chain: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl AutowireError {
    /// Shorthand for [`AutowireError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for [`AutowireError::Parse`].
    pub fn parse(callable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            callable: callable.into(),
            reason: reason.into(),
        }
    }
}

impl Clone for AutowireError {
    fn clone(&self) -> Self {
        match self {
            Self::Parse {
                callable,
                reason,
            } => Self::Parse {
                callable: callable.clone(),
                reason: reason.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            Self::UnresolvedDependency {
                parameter,
                function,
                file,
                suggestion,
            } => Self::UnresolvedDependency {
                parameter: parameter.clone(),
                function: function.clone(),
                file: file.clone(),
                suggestion: suggestion.clone(),
            },
            Self::ModuleLoad {
                name,
                path,
                reason,
            } => Self::ModuleLoad {
                name: name.clone(),
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::MixinResolution {
                mixin,
                target,
            } => Self::MixinResolution {
                mixin: mixin.clone(),
                target: target.clone(),
            },
            Self::ProxyResolution {
                proxy,
                target,
                reason,
            } => Self::ProxyResolution {
                proxy: proxy.clone(),
                target: target.clone(),
                reason: reason.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            // io, json and toml errors are not Clone; keep their message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::JsonError(e) => Self::Other {
                message: format!("JSON parsing error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that adds user-facing details and suggestions.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AutowireError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: AutowireError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: message in red, details in yellow,
    /// suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`AutowireError`] (with tailored suggestions), IO errors and
/// TOML errors; anything else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(autowire_error) = error.downcast_ref::<AutowireError>() {
        return create_error_context(autowire_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ErrorContext::new(AutowireError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Check that the file or directory exists and the path is correct");
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(AutowireError::config(toml_error.to_string()))
            .with_suggestion("Check the TOML syntax of autowire.toml")
            .with_details("The configuration file is read from the project root");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AutowireError::Other {
        message,
    })
}

fn create_error_context(error: AutowireError) -> ErrorContext {
    match &error {
        AutowireError::Parse { .. } => ErrorContext::new(error)
            .with_suggestion("Declarations look like `fn name(a, b = 1)`, `|a, b|` or `impl Name { fn new(a) }`")
            .with_details("Parameter names are read from the declaration text, never by running the callable"),

        AutowireError::UnresolvedDependency {
            parameter,
            suggestion,
            ..
        } => {
            let hint = match suggestion {
                Some(name) => format!("Did you mean '{name}'? Otherwise wire '{parameter}' or add an import path"),
                None => format!("Wire '{parameter}' explicitly, alias it, or add the directory that contains it as an import path"),
            };
            ErrorContext::new(error.clone())
                .with_suggestion(hint)
                .with_details("Safe mode refuses to call a function with an unresolved argument")
        }

        AutowireError::ModuleLoad { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the module at the reported path; load failures are never cached as 'not found'"),

        AutowireError::CircularDependency { .. } => ErrorContext::new(error)
            .with_suggestion("Break the cycle by wiring one of the components explicitly or passing it as an override"),

        AutowireError::MixinResolution { mixin, .. } => {
            let hint = format!("Make '{mixin}' resolvable (wire it or add it to the index)");
            ErrorContext::new(error).with_suggestion(hint)
        }

        AutowireError::ProxyResolution { .. } => ErrorContext::new(error)
            .with_suggestion("A proxy must resolve to a function taking the instance as its first parameter"),

        AutowireError::Config { .. } => ErrorContext::new(error)
            .with_details("Check autowire.toml and the names passed to the registry"),

        _ => ErrorContext::new(error),
    }
}
