//! Per-project registry of names, caches and wiring.
//!
//! A [`Registry`] belongs to one project root and owns every table the
//! resolver reads:
//!
//! | Table | Holds |
//! |---|---|
//! | index | logical name → module path, built lazily on first need |
//! | package roots | package name → directory, for `pkg$sub` decomposition |
//! | module cache | resolved candidates (components and values) |
//! | instance cache | singleton instances, never mixed with candidates |
//! | component instances | singletons of components given directly, keyed by identity |
//! | not-found set | names that resolved to nothing |
//! | aliases | name → replacement name, one step only |
//! | wiring | explicit values, explicit classes, mark-as-class flags |
//! | tags | diagnostic tags of produced non-instance values |
//!
//! A name is never in the module cache and the not-found set at once.
//!
//! [`RegistrySet`] shares one registry per project root across injectors,
//! so repeated entry points in a project reuse the same index and caches.

pub mod index;
pub mod loader;

use crate::core::{AutowireError, AutowireMeta, AutowireTag, Dependency, Result};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use index::{IndexOptions, NameIndex, build_index, scan_tree};
use loader::{ModuleLoader, ModuleTable};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Separator splitting `package$sub$module` names.
pub const DEFAULT_SEPARATOR: char = '$';

/// Registry-wide settings.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// What the index contains
    pub index: IndexOptions,
    /// Submodule separator
    pub separator: char,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            index: IndexOptions::default(),
            separator: DEFAULT_SEPARATOR,
        }
    }
}

/// How a name was wired or marked as a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassMark {
    /// Reuse the first instance
    pub singleton: bool,
}

/// Registry for a single project root.
pub struct Registry {
    root: PathBuf,
    options: RegistryOptions,
    loader: Arc<dyn ModuleLoader>,

    index: DashMap<String, PathBuf>,
    package_roots: DashMap<String, PathBuf>,
    indexed: AtomicBool,
    index_lock: Mutex<()>,
    import_paths: Mutex<Vec<PathBuf>>,

    module_cache: DashMap<String, Dependency>,
    instance_cache: DashMap<String, Dependency>,
    // address of the component -> (component, instance); holding the
    // component keeps the address from being reused
    component_instances: DashMap<usize, (Dependency, Dependency)>,
    not_found: DashSet<String>,

    aliases: DashMap<String, String>,
    wired: DashMap<String, Dependency>,
    wired_classes: DashMap<String, (Dependency, ClassMark)>,
    marked_as_class: DashMap<String, ClassMark>,
    tags: DashMap<String, AutowireTag>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.root)
            .field("indexed", &self.indexed.load(Ordering::Acquire))
            .field("names", &self.index.len())
            .field("cached", &self.module_cache.len())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    /// Registry with default options and an empty [`ModuleTable`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_loader(root, RegistryOptions::default(), Arc::new(ModuleTable::new()))
    }

    /// Registry with explicit options and loader.
    ///
    /// The alias `_` → `lodash` is seeded.
    pub fn with_loader(
        root: impl Into<PathBuf>,
        options: RegistryOptions,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        let registry = Self {
            root,
            options,
            loader,
            index: DashMap::new(),
            package_roots: DashMap::new(),
            indexed: AtomicBool::new(false),
            index_lock: Mutex::new(()),
            import_paths: Mutex::new(Vec::new()),
            module_cache: DashMap::new(),
            instance_cache: DashMap::new(),
            component_instances: DashMap::new(),
            not_found: DashSet::new(),
            aliases: DashMap::new(),
            wired: DashMap::new(),
            wired_classes: DashMap::new(),
            marked_as_class: DashMap::new(),
            tags: DashMap::new(),
        };
        registry.seed_aliases();
        registry
    }

    fn seed_aliases(&self) {
        self.aliases.insert("_".to_string(), "lodash".to_string());
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry options.
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Module loader.
    pub fn loader(&self) -> &dyn ModuleLoader {
        self.loader.as_ref()
    }

    // ---- configuration ----

    /// Redirect `name` to `target` (one step).
    pub fn alias(&self, name: impl Into<String>, target: impl Into<String>) -> Result<()> {
        let name = name.into();
        let target = target.into();
        if name.is_empty() || target.is_empty() {
            return Err(AutowireError::config("alias names cannot be empty"));
        }
        if name == target {
            return Err(AutowireError::config(format!("alias '{name}' points at itself")));
        }
        debug!("Alias '{}' -> '{}'", name, target);
        self.evict(&name);
        self.aliases.insert(name, target);
        Ok(())
    }

    /// Target of an alias.
    pub fn alias_target(&self, name: &str) -> Option<String> {
        self.aliases.get(name).map(|t| t.clone())
    }

    /// Wire an explicit value; it always wins over discovery.
    pub fn wire(&self, name: impl Into<String>, value: impl Into<Dependency>) {
        let name = name.into();
        debug!("Wired '{}'", name);
        self.evict(&name);
        self.wired.insert(name, value.into());
    }

    /// Wire a callable to be instantiated whenever `name` is resolved.
    pub fn wire_class(&self, name: impl Into<String>, class: impl Into<Dependency>, singleton: bool) -> Result<()> {
        let name = name.into();
        let class = class.into();
        if !class.is_callable() {
            return Err(AutowireError::config(format!(
                "cannot wire '{name}' as a class: a {} is not callable",
                class.kind()
            )));
        }
        debug!("Wired class '{}' (singleton: {})", name, singleton);
        self.evict(&name);
        self.wired_classes.insert(name, (class, ClassMark { singleton }));
        Ok(())
    }

    /// Treat whatever `name` resolves to as a class to instantiate.
    pub fn mark_as_class(&self, name: impl Into<String>, singleton: bool) {
        let name = name.into();
        debug!("Marked '{}' as class (singleton: {})", name, singleton);
        self.evict(&name);
        self.marked_as_class.insert(name, ClassMark { singleton });
    }

    /// Add a directory to the index.
    ///
    /// If the index already exists the directory is scanned at once and the
    /// not-found set is cleared, since names missing before may exist now.
    pub fn add_import_path(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        {
            let mut paths = lock(&self.import_paths);
            if paths.contains(&dir) {
                return;
            }
            paths.push(dir.clone());
        }
        info!("Added import path {}", dir.display());

        let _guard = lock(&self.index_lock);
        if self.indexed.load(Ordering::Acquire) {
            let mut extra = NameIndex::default();
            scan_tree(&dir, &self.options.index, &mut extra);
            self.merge_index(&extra);
            self.not_found.clear();
        }
    }

    /// Import directories added so far.
    pub fn import_paths(&self) -> Vec<PathBuf> {
        lock(&self.import_paths).clone()
    }

    pub(crate) fn wired(&self, name: &str) -> Option<Dependency> {
        self.wired.get(name).map(|d| d.clone())
    }

    pub(crate) fn wired_class(&self, name: &str) -> Option<(Dependency, ClassMark)> {
        self.wired_classes.get(name).map(|entry| entry.clone())
    }

    pub(crate) fn class_mark(&self, name: &str) -> Option<ClassMark> {
        self.marked_as_class.get(name).map(|m| *m)
    }

    /// Instantiation metadata in effect for `dependency` resolved under `name`.
    ///
    /// A wired class or a mark-as-class entry replaces the component's own
    /// `instantiate`/`singleton` flags; mixins and proxy stay.
    pub fn effective_meta(&self, name: &str, dependency: &Dependency) -> Option<AutowireMeta> {
        let own = dependency.meta().cloned();
        let mark = self
            .wired_classes
            .get(name)
            .map(|entry| entry.1)
            .or_else(|| self.class_mark(name));
        match mark {
            Some(mark) => Some(AutowireMeta {
                instantiate: true,
                singleton: mark.singleton,
                ..own.unwrap_or_default()
            }),
            None => own,
        }
    }

    // ---- index ----

    /// Build the index unless it exists.
    pub fn ensure_index(&self) {
        if self.indexed.load(Ordering::Acquire) {
            return;
        }
        let _guard = lock(&self.index_lock);
        if self.indexed.load(Ordering::Acquire) {
            return;
        }
        let built = build_index(&self.root, &self.import_paths(), &self.options.index);
        self.merge_index(&built);
        self.indexed.store(true, Ordering::Release);
    }

    /// Rebuild the index from scratch.
    pub fn rebuild_index(&self) {
        {
            let _guard = lock(&self.index_lock);
            self.index.clear();
            self.package_roots.clear();
            self.indexed.store(false, Ordering::Release);
        }
        self.ensure_index();
    }

    fn merge_index(&self, built: &NameIndex) {
        for (name, path) in built.entries() {
            self.index.insert(name.clone(), path.clone());
        }
        for (name, dir) in built.packages() {
            self.package_roots.insert(name.clone(), dir.clone());
        }
    }

    /// Indexed path of `name`.
    pub fn lookup_index(&self, name: &str) -> Option<PathBuf> {
        self.index.get(name).map(|p| p.clone())
    }

    /// Package directory of `name`.
    pub fn package_root(&self, name: &str) -> Option<PathBuf> {
        self.package_roots.get(name).map(|p| p.clone())
    }

    /// Snapshot of the index, sorted by name.
    pub fn indexed_names(&self) -> Vec<(String, PathBuf)> {
        let mut names: Vec<(String, PathBuf)> =
            self.index.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
        names.sort();
        names
    }

    /// Closest known name to `name`, if it looks like a typo.
    pub fn suggest(&self, name: &str) -> Option<String> {
        let threshold = (name.chars().count() / 3).max(1);
        let known = self
            .index
            .iter()
            .map(|e| e.key().clone())
            .chain(self.wired.iter().map(|e| e.key().clone()))
            .chain(self.wired_classes.iter().map(|e| e.key().clone()))
            .chain(self.aliases.iter().map(|e| e.key().clone()));

        known
            .filter(|candidate| candidate != name)
            .map(|candidate| (strsim::levenshtein(name, &candidate), candidate))
            .filter(|(distance, _)| *distance <= threshold)
            .min()
            .map(|(_, candidate)| candidate)
    }

    // ---- caches ----

    pub(crate) fn cached(&self, name: &str) -> Option<Dependency> {
        self.module_cache.get(name).map(|d| d.clone())
    }

    pub(crate) fn cache(&self, name: &str, dependency: &Dependency) {
        self.not_found.remove(name);
        self.module_cache.insert(name.to_string(), dependency.clone());
    }

    pub(crate) fn mark_not_found(&self, name: &str) {
        if !self.module_cache.contains_key(name) {
            self.not_found.insert(name.to_string());
        }
    }

    /// Whether `name` is known to resolve to nothing.
    pub fn is_not_found(&self, name: &str) -> bool {
        self.not_found.contains(name)
    }

    /// Whether `name` has a cached candidate.
    pub fn is_cached(&self, name: &str) -> bool {
        self.module_cache.contains_key(name)
    }

    pub(crate) fn singleton(&self, name: &str) -> Option<Dependency> {
        self.instance_cache.get(name).map(|d| d.clone())
    }

    pub(crate) fn store_singleton(&self, name: &str, instance: &Dependency) {
        self.instance_cache.insert(name.to_string(), instance.clone());
    }

    pub(crate) fn component_singleton(&self, component: &Dependency) -> Option<Dependency> {
        self.component_instances.get(&component.addr()).map(|entry| entry.1.clone())
    }

    pub(crate) fn store_component_singleton(&self, component: &Dependency, instance: &Dependency) {
        self.component_instances
            .insert(component.addr(), (component.clone(), instance.clone()));
    }

    pub(crate) fn record_tag(&self, name: &str, tag: AutowireTag) {
        self.tags.entry(name.to_string()).or_insert(tag);
    }

    /// Diagnostic tag of a produced non-instance value.
    pub fn tag(&self, name: &str) -> Option<AutowireTag> {
        self.tags.get(name).map(|t| *t)
    }

    fn evict(&self, name: &str) {
        self.module_cache.remove(name);
        self.instance_cache.remove(name);
        self.not_found.remove(name);
    }

    /// Drop cached candidates, instances and not-found entries.
    ///
    /// Wiring, aliases and the index stay.
    pub fn invalidate_cache(&self) {
        debug!("Invalidating caches for {}", self.root.display());
        self.module_cache.clear();
        self.instance_cache.clear();
        self.component_instances.clear();
        self.not_found.clear();
        self.tags.clear();
    }

    /// Forget everything, including wiring, import paths and the index.
    pub fn reset(&self) {
        debug!("Resetting registry for {}", self.root.display());
        self.invalidate_cache();
        self.aliases.clear();
        self.wired.clear();
        self.wired_classes.clear();
        self.marked_as_class.clear();
        lock(&self.import_paths).clear();
        {
            let _guard = lock(&self.index_lock);
            self.index.clear();
            self.package_roots.clear();
            self.indexed.store(false, Ordering::Release);
        }
        self.seed_aliases();
    }
}

/// Registries keyed by project root.
pub struct RegistrySet {
    registries: DashMap<PathBuf, Arc<Registry>>,
    loader: Arc<dyn ModuleLoader>,
}

impl Default for RegistrySet {
    fn default() -> Self {
        Self::new(Arc::new(ModuleTable::new()))
    }
}

impl RegistrySet {
    /// Set whose registries all load modules through `loader`.
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            registries: DashMap::new(),
            loader,
        }
    }

    /// Registry for `root`.
    ///
    /// On first use the registry is created with `options` and handed to
    /// `init` before anyone else can see it; a failing `init` leaves no
    /// registry behind.
    pub fn get_or_init(
        &self,
        root: &Path,
        options: impl FnOnce() -> RegistryOptions,
        init: impl FnOnce(&Registry) -> Result<()>,
    ) -> Result<Arc<Registry>> {
        let key = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        match self.registries.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                debug!("Creating registry for {}", entry.key().display());
                let registry = Registry::with_loader(entry.key().clone(), options(), Arc::clone(&self.loader));
                init(&registry)?;
                Ok(Arc::clone(entry.insert(Arc::new(registry)).value()))
            }
        }
    }

    /// Registry for `root` with default options.
    pub fn for_root(&self, root: &Path) -> Arc<Registry> {
        let key = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        self.registries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Registry::with_loader(key, RegistryOptions::default(), Arc::clone(&self.loader))))
            .clone()
    }

    /// Loader shared by every registry of the set.
    pub fn loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.loader
    }

    /// Number of registries.
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    /// Whether no registry was created yet.
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Drop every registry.
    pub fn clear(&self) {
        self.registries.clear();
    }
}
