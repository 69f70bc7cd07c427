//! Test utilities for autowire
//!
//! Helpers shared by unit and integration tests:
//! - [`init_test_logging`] installs a tracing subscriber once per process
//! - [`TestProject`] lays out a throwaway project tree (manifest, source and
//!   data files, installed packages) and hands out injectors for it
//!
//! # Example
//!
//! ```rust,no_run
//! use autowire::core::Overrides;
//! use autowire::test_utils::TestProject;
//!
//! let project = TestProject::new().unwrap();
//! project.write("src/settings.json", r#"{ "debug": true }"#).unwrap();
//!
//! let injector = project.injector();
//! assert!(injector.get_instance("settings", &Overrides::new()).unwrap().is_some());
//! ```

use crate::core::{Dependency, ResolutionContext};
use crate::injector::Injector;
use crate::registry::loader::ModuleTable;
use crate::registry::{Registry, RegistryOptions, RegistrySet};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, nothing is
/// logged.
///
/// ```bash
/// RUST_LOG=autowire=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// A temporary project with a `package.json` at its root.
///
/// Components "compiled into the host" are registered against file paths
/// with [`native`](Self::native); the file is created empty so the index
/// finds it.
pub struct TestProject {
    temp_dir: TempDir,
    modules: Arc<ModuleTable>,
}

impl TestProject {
    /// Create the project directory and its manifest.
    pub fn new() -> Result<Self> {
        init_test_logging(None);
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let project = Self {
            temp_dir,
            modules: Arc::new(ModuleTable::new()),
        };
        project.write("package.json", r#"{ "name": "test-project" }"#)?;
        Ok(project)
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Module table backing every registry of this project.
    pub fn modules(&self) -> &Arc<ModuleTable> {
        &self.modules
    }

    /// Write a file relative to the root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Create `relative` and register `module` as its native module.
    pub fn native(&self, relative: &str, module: impl Into<Dependency>) -> Result<PathBuf> {
        let path = self.write(relative, "")?;
        self.modules.register_native(path.clone(), module);
        Ok(path)
    }

    /// Install a package under `node_modules/<dir>` with the given manifest
    /// fields and entry file content.
    pub fn install_package(&self, dir: &str, name: Option<&str>, main: &str, content: &str) -> Result<PathBuf> {
        let manifest = match name {
            Some(name) => serde_json::json!({ "name": name, "main": main }),
            None => serde_json::json!({ "main": main }),
        };
        self.write(&format!("node_modules/{dir}/package.json"), &manifest.to_string())?;
        self.write(&format!("node_modules/{dir}/{main}"), content)
    }

    /// A fresh registry over this project.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::new(Registry::with_loader(self.path(), RegistryOptions::default(), self.modules.clone()))
    }

    /// An injector over a fresh registry, working from `src/main.rs`.
    pub fn injector(&self) -> Injector {
        Injector::new(self.registry()).with_context(ResolutionContext::for_file(self.path().join("src/main.rs")))
    }

    /// A registry set sharing this project's module table.
    pub fn registry_set(&self) -> RegistrySet {
        RegistrySet::new(self.modules.clone())
    }
}
