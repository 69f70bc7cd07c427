//! Name resolution against real project trees.

use anyhow::Result;
use autowire::core::{Arguments, AutowireError, Dependency, Function, Overrides, ResolutionContext};
use autowire::injector::Injector;
use autowire::registry::Registry;
use autowire::resolver::{ResolutionSource, Resolver};
use autowire::test_utils::TestProject;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

struct FsModule {
    root: PathBuf,
}

impl FsModule {
    fn read(&self, relative: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(relative))
    }
}

fn json_of(dependency: &Dependency) -> Option<&serde_json::Value> {
    dependency.downcast_ref::<serde_json::Value>()
}

#[test]
fn test_repeated_injection_hands_out_the_same_module() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/config/app-settings.json", r#"{ "port": 8080 }"#)?;
    let injector = project.injector();

    let echo = || Function::new("fn echo(appSettings)", |args: &Arguments| {
        Ok(args.get("appSettings").cloned().unwrap_or_else(|| Dependency::value(())))
    });
    let first = injector.inject(echo(), &Overrides::new())?;
    let second = injector.inject(echo(), &Overrides::new())?;

    assert!(first.ptr_eq(&second));
    assert_eq!(json_of(&first), Some(&json!({ "port": 8080 })));
    Ok(())
}

#[test]
fn test_builtin_module_reaches_the_function() -> Result<()> {
    let project = TestProject::new()?;
    project.write("README.md", "hello from disk")?;
    project.modules().register_builtin(
        "fs",
        Dependency::value(FsModule {
            root: project.path().to_path_buf(),
        }),
    );

    let read_readme = Function::returning("fn read_readme(fs)", |args: &Arguments| {
        Ok(args.require::<FsModule>("fs")?.read("README.md")?)
    });
    let content = project.injector().inject(read_readme, &Overrides::new())?;

    assert_eq!(content.downcast_ref::<String>().map(String::as_str), Some("hello from disk"));
    Ok(())
}

#[test]
fn test_not_found_names_are_remembered() -> Result<()> {
    let project = TestProject::new()?;
    let registry = project.registry();
    let resolver = Resolver::new(&registry);

    assert!(resolver.resolve("missingThing")?.is_none());
    assert!(registry.is_not_found("missingThing"));
    assert!(!registry.is_cached("missingThing"));

    // appears on disk, but the negative answer sticks until caches are dropped
    project.write("src/missing-thing.json", "[]")?;
    assert!(resolver.resolve("missingThing")?.is_none());

    registry.invalidate_cache();
    registry.rebuild_index();
    let found = resolver.resolve("missingThing")?.expect("indexed after rebuild");
    assert_eq!(json_of(&found.dependency), Some(&json!([])));
    assert!(registry.is_cached("missingThing"));
    assert!(!registry.is_not_found("missingThing"));
    Ok(())
}

#[test]
fn test_alias_is_transparent() -> Result<()> {
    let project = TestProject::new()?;
    project.install_package("heavy-uuid-lib", None, "lib/uuid.json", r#"{ "version": 4 }"#)?;
    let injector = project.injector();
    injector.registry().alias("u", "heavy-uuid-lib")?;

    let via_alias = injector.get_instance("u", &Overrides::new())?.expect("alias resolves");
    let direct = injector.get_instance("heavy-uuid-lib", &Overrides::new())?.expect("package resolves");

    assert!(via_alias.ptr_eq(&direct));
    assert_eq!(json_of(&direct), Some(&json!({ "version": 4 })));
    Ok(())
}

#[test]
fn test_package_manifest_name_is_indexed() -> Result<()> {
    let project = TestProject::new()?;
    project.install_package("uuid-impl", Some("nodeUuid"), "index.json", r#"{ "v4": true }"#)?;
    let registry = project.registry();

    let candidate = Resolver::new(&registry).resolve("nodeUuid")?.expect("indexed by manifest name");
    assert_eq!(candidate.source, ResolutionSource::Index);
    assert_eq!(json_of(&candidate.dependency), Some(&json!({ "v4": true })));
    Ok(())
}

#[test]
fn test_submodule_paths_are_decomposed() -> Result<()> {
    let project = TestProject::new()?;
    project.install_package("pkg", Some("pkg"), "main.json", "{}")?;
    project.write("node_modules/pkg/lib/helper.json", r#"{ "helper": true }"#)?;
    project.write("src/tools/tools.json", "{}")?;
    project.write("src/tools/format.toml", "width = 80\n")?;

    let injector = project.injector();
    let helper = injector.get_instance("pkg$lib$helper", &Overrides::new())?.expect("package submodule");
    assert_eq!(json_of(&helper), Some(&json!({ "helper": true })));

    // `tools` is indexed at src/tools/tools.json, so `tools$format` looks in src/tools
    let format = injector.get_instance("tools$format", &Overrides::new())?.expect("local submodule");
    assert_eq!(json_of(&format), Some(&json!({ "width": 80 })));
    Ok(())
}

#[test]
fn test_broken_module_is_reported_and_retried() -> Result<()> {
    let project = TestProject::new()?;
    let path = project.write("src/broken-config.json", "{ definitely not json")?;
    let injector = project.injector();

    let err = injector.get_instance("brokenConfig", &Overrides::new()).unwrap_err();
    match err.downcast_ref::<AutowireError>() {
        Some(AutowireError::ModuleLoad { name, path: failed, .. }) => {
            assert_eq!(name, "brokenConfig");
            assert!(failed.ends_with("broken-config.json"));
        }
        other => panic!("expected a module load error, got {other:?}"),
    }
    assert!(!injector.registry().is_not_found("brokenConfig"));

    std::fs::write(&path, r#"{ "fixed": true }"#)?;
    let fixed = injector.get_instance("brokenConfig", &Overrides::new())?.expect("loads once fixed");
    assert_eq!(json_of(&fixed), Some(&json!({ "fixed": true })));
    Ok(())
}

#[test]
fn test_import_path_relative_to_context() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let app = temp.path().join("app");
    std::fs::create_dir_all(app.join("src"))?;
    std::fs::write(app.join("package.json"), "{}")?;
    std::fs::create_dir_all(temp.path().join("shared"))?;
    std::fs::write(temp.path().join("shared/feature-flags.json"), r#"{ "beta": false }"#)?;

    let injector = Injector::new(Arc::new(Registry::new(&app)))
        .with_context(ResolutionContext::for_file(app.join("src/main.rs")));
    assert!(injector.with_safe(false).get_instance("featureFlags", &Overrides::new())?.is_none());

    // relative to app/src, where the injecting file lives
    injector.add_import_path("../../shared");
    let flags = injector.get_instance("featureFlags", &Overrides::new())?.expect("found after import path");
    assert_eq!(json_of(&flags), Some(&json!({ "beta": false })));
    Ok(())
}

#[test]
fn test_source_file_without_native_module_is_not_found() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/orphan.rs", "pub fn orphan() {}")?;
    let injector = project.injector().with_safe(false);

    assert!(injector.get_instance("orphan", &Overrides::new())?.is_none());
    assert!(injector.registry().is_not_found("orphan"));
    Ok(())
}

#[test]
fn test_dependencies_dir_and_hidden_dirs_are_not_walked() -> Result<()> {
    let project = TestProject::new()?;
    project.write("node_modules/some-pkg/internal-detail.json", "{}")?;
    project.write(".cache/stale.json", "{}")?;
    let registry = project.registry();
    registry.ensure_index();

    let names: Vec<String> = registry.indexed_names().into_iter().map(|(name, _)| name).collect();
    assert!(!names.contains(&"internalDetail".to_string()));
    assert!(!names.contains(&"stale".to_string()));
    assert!(!names.contains(&"package".to_string()));
    Ok(())
}
