//! Project index: logical name → module path.
//!
//! The index is built once per project root by walking the source tree and
//! the installed-dependency directory. File names become logical names
//! (extension stripped, `kebab-case` turned into `camelCase`), so a parameter
//! called `nodeUuid` finds `node-uuid.json` without further configuration.
//!
//! # Walk rules
//!
//! - hidden entries, the dependencies directory and directories matching an
//!   ignore pattern are skipped
//! - only files with an indexed extension are registered
//! - reserved names ([`RESERVED_NAMES`]) are never registered
//! - when two files map to the same name a warning is logged and the one
//!   visited later wins; the walk is sorted by file name, and extra import
//!   directories are walked after the project tree
//!
//! Packages under the dependencies directory are read one level deep (two for
//! `@scope/` directories); each registers the `name` declared in its manifest
//! and points at its `main` entry.

use crate::core::{AutowireError, Result};
use convert_case::{Case, Casing};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Names that files and packages can never register.
pub const RESERVED_NAMES: &[&str] = &["package", "index", "mod"];

/// Settings controlling what the index contains.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// File marking a project (or package) root
    pub manifest_file: String,
    /// Directory holding installed packages, relative to the root
    pub dependencies_dir: String,
    /// Indexed file extensions, without the dot
    pub extensions: Vec<String>,
    /// Directory name patterns to skip
    pub ignore: Vec<glob::Pattern>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            manifest_file: "package.json".to_string(),
            dependencies_dir: "node_modules".to_string(),
            extensions: vec!["rs".to_string(), "json".to_string(), "toml".to_string()],
            ignore: Vec::new(),
        }
    }
}

impl IndexOptions {
    /// Compile ignore patterns, rejecting invalid globs.
    pub fn with_ignore_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.ignore = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p.as_ref()).map_err(|e| {
                    AutowireError::config(format!("invalid ignore pattern '{}': {e}", p.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    fn is_indexed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    fn is_ignored_dir(&self, name: &str) -> bool {
        name == self.dependencies_dir || self.ignore.iter().any(|p| p.matches(name))
    }
}

/// Manifest fields read from the project and from each installed package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    /// Declared public name
    pub name: Option<String>,
    /// Entry file, relative to the package directory
    pub main: Option<String>,
}

/// Read a manifest as JSON, or as TOML when the file name ends in `.toml`.
pub fn read_package_manifest(path: &Path) -> Result<PackageManifest> {
    let content = std::fs::read_to_string(path)?;
    if path.extension().is_some_and(|e| e == "toml") {
        Ok(toml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// The name → path table produced by [`build_index`].
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: BTreeMap<String, PathBuf>,
    packages: BTreeMap<String, PathBuf>,
}

impl NameIndex {
    /// Module path registered under `name`.
    pub fn get(&self, name: &str) -> Option<&PathBuf> {
        self.entries.get(name)
    }

    /// Package directory registered under `name`.
    pub fn package_root(&self, name: &str) -> Option<&PathBuf> {
        self.packages.get(name)
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    /// All package roots, sorted by name.
    pub fn packages(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.packages.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn register(&mut self, name: String, path: PathBuf) {
        if RESERVED_NAMES.contains(&name.as_str()) {
            trace!("Skipping reserved name '{}' ({})", name, path.display());
            return;
        }
        if let Some(previous) = self.entries.get(&name) {
            if previous != &path {
                warn!(
                    "Name '{}' maps to both {} and {}; using the latter",
                    name,
                    previous.display(),
                    path.display()
                );
            }
        }
        self.entries.insert(name, path);
    }
}

/// Find the nearest ancestor of `start` holding one of `markers`.
///
/// Falls back to `start` itself when no ancestor qualifies.
pub fn find_project_root(start: &Path, markers: &[&str]) -> PathBuf {
    let mut current = Some(start);
    while let Some(dir) = current {
        if markers.iter().any(|marker| dir.join(marker).is_file()) {
            debug!("Project root for {} is {}", start.display(), dir.display());
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    debug!("No project marker above {}; using it as root", start.display());
    start.to_path_buf()
}

/// Logical name of a file stem: `node-uuid` → `nodeUuid`.
///
/// Stems without a hyphen are kept as written; hyphenated ones are
/// camel-cased word by word.
pub fn logical_name(stem: &str) -> String {
    if stem.contains('-') {
        stem.from_case(Case::Kebab).to_case(Case::Camel)
    } else {
        stem.to_string()
    }
}

/// Build the index for `root`, then for each extra directory in order.
pub fn build_index(root: &Path, extra_dirs: &[PathBuf], options: &IndexOptions) -> NameIndex {
    let mut index = NameIndex::default();

    scan_tree(root, options, &mut index);
    scan_dependencies(root, options, &mut index);
    for dir in extra_dirs {
        scan_tree(dir, options, &mut index);
    }

    info!(
        "Indexed {} names ({} packages) under {}",
        index.entries.len(),
        index.packages.len(),
        root.display()
    );
    index
}

/// Walk one directory tree into `index`.
pub fn scan_tree(dir: &Path, options: &IndexOptions, index: &mut NameIndex) {
    if !dir.is_dir() {
        warn!("Import directory {} does not exist; skipping", dir.display());
        return;
    }
    debug!("Scanning {}", dir.display());

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !skip_entry(entry, options));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !options.is_indexed_extension(entry.path()) {
            continue;
        }
        let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        trace!("Indexing {}", entry.path().display());
        index.register(logical_name(stem), entry.path().to_path_buf());
    }
}

fn skip_entry(entry: &DirEntry, options: &IndexOptions) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && options.is_ignored_dir(&name)
}

/// Register every installed package under `root`.
pub fn scan_dependencies(root: &Path, options: &IndexOptions, index: &mut NameIndex) {
    let deps_dir = root.join(&options.dependencies_dir);
    for dir in sorted_subdirs(&deps_dir) {
        let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if dir_name.starts_with('.') {
            continue;
        }
        if dir_name.starts_with('@') {
            for scoped in sorted_subdirs(&dir) {
                register_package(&scoped, options, index);
            }
        } else {
            register_package(&dir, options, index);
        }
    }
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> =
        entries.filter_map(std::result::Result::ok).map(|e| e.path()).filter(|p| p.is_dir()).collect();
    dirs.sort();
    dirs
}

fn register_package(dir: &Path, options: &IndexOptions, index: &mut NameIndex) {
    let manifest_path = dir.join(&options.manifest_file);
    let manifest = if manifest_path.is_file() {
        match read_package_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Ignoring unreadable package manifest {}: {}", manifest_path.display(), e);
                return;
            }
        }
    } else {
        PackageManifest::default()
    };

    let fallback = match (dir.parent().and_then(Path::file_name), dir.file_name()) {
        (Some(scope), Some(name)) if scope.to_string_lossy().starts_with('@') => {
            format!("{}/{}", scope.to_string_lossy(), name.to_string_lossy())
        }
        (_, Some(name)) => name.to_string_lossy().into_owned(),
        _ => return,
    };
    let name = manifest.name.unwrap_or(fallback);
    let entry = dir.join(manifest.main.as_deref().unwrap_or("index"));

    debug!("Package '{}' -> {}", name, entry.display());
    index.packages.insert(name.clone(), dir.to_path_buf());
    index.register(name, entry);
}
