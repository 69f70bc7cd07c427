//! Argument assembly, safe/unsafe modes, singletons and deep injection.

use anyhow::Result;
use autowire::core::{Arguments, AutowireError, AutowireMeta, Class, Dependency, Function, Overrides};
use autowire::injector::Injector;
use autowire::registry::index::IndexOptions;
use autowire::registry::loader::{LoadResult, ModuleLoader, ModuleTable};
use autowire::registry::{Registry, RegistryOptions};
use autowire::test_utils::TestProject;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Connection {
    id: usize,
}

struct Mailer {
    host: String,
}

struct Service {
    config: serde_json::Value,
}

fn counting_class(declaration: &str, built: &Arc<AtomicUsize>) -> Class {
    let built = Arc::clone(built);
    Class::new(declaration, move |_: &Arguments| {
        Ok(Connection {
            id: built.fetch_add(1, Ordering::SeqCst),
        })
    })
}

/// Counts the imports that reach the underlying table.
struct CountingLoader {
    table: ModuleTable,
    packages: AtomicUsize,
    paths: AtomicUsize,
}

impl ModuleLoader for CountingLoader {
    fn import_package(&self, name: &str, root: &Path, options: &IndexOptions) -> LoadResult {
        self.packages.fetch_add(1, Ordering::SeqCst);
        self.table.import_package(name, root, options)
    }

    fn import_path(&self, path: &Path, options: &IndexOptions) -> LoadResult {
        self.paths.fetch_add(1, Ordering::SeqCst);
        self.table.import_path(path, options)
    }
}

#[test]
fn test_override_then_default_then_registry() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/timeout.json", "30")?;
    project.write("src/retries.json", "5")?;
    let injector = project.injector();

    let connect = Function::returning("fn connect(host, timeout, retries = 3)", |args: &Arguments| {
        Ok(json!({
            "host": args.require::<serde_json::Value>("host")?,
            "timeout": args.require::<serde_json::Value>("timeout")?,
            "retries": args.require::<serde_json::Value>("retries")?,
        }))
    });
    let overrides = Overrides::new().with("host", json!("db.internal"));
    let result = injector.inject(connect, &overrides)?;

    // the literal default hides src/retries.json
    assert_eq!(
        result.downcast_ref::<serde_json::Value>(),
        Some(&json!({ "host": "db.internal", "timeout": 30, "retries": 3 }))
    );
    Ok(())
}

#[test]
fn test_singleton_and_transient_classes() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    let built = Arc::new(AtomicUsize::new(0));

    injector.registry().wire_class("pool", counting_class("impl Pool { fn new() }", &built), true)?;
    injector.registry().wire_class("connection", counting_class("impl Connection { fn new() }", &built), false)?;

    let first_pool = injector.get_instance("pool", &Overrides::new())?.expect("pool");
    let second_pool = injector.get_instance("pool", &Overrides::new())?.expect("pool");
    assert!(first_pool.ptr_eq(&second_pool));

    let first = injector.get_instance("connection", &Overrides::new())?.expect("connection");
    let second = injector.get_instance("connection", &Overrides::new())?.expect("connection");
    assert!(!first.ptr_eq(&second));
    assert_ne!(
        first.downcast_ref::<Connection>().map(|c| c.id),
        second.downcast_ref::<Connection>().map(|c| c.id)
    );

    assert_eq!(built.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn test_native_singleton_is_shared_between_consumers() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/smtp-host.json", r#""mail.example.com""#)?;
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    project.native(
        "src/services/mailer.rs",
        Class::new("impl Mailer { fn new(smtpHost) }", move |args: &Arguments| {
            counter.fetch_add(1, Ordering::SeqCst);
            let host = args.require::<serde_json::Value>("smtpHost")?;
            Ok(Mailer {
                host: host.as_str().unwrap_or_default().to_string(),
            })
        })
        .with_autowire(AutowireMeta::instantiate().singleton(true)),
    )?;
    let injector = project.injector();

    let passthrough = || Function::new("fn notify(mailer)", |args: &Arguments| {
        Ok(args.get("mailer").cloned().unwrap_or_else(|| Dependency::value(())))
    });
    let a = injector.inject(passthrough(), &Overrides::new())?;
    let b = injector.inject(passthrough(), &Overrides::new())?;
    let direct = injector.get_instance("mailer", &Overrides::new())?.expect("mailer");

    assert!(a.ptr_eq(&b));
    assert!(a.ptr_eq(&direct));
    assert_eq!(a.downcast_ref::<Mailer>().map(|m| m.host.as_str()), Some("mail.example.com"));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_safe_mode_reports_and_suggests() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/user-service.json", "{}")?;
    let injector = project.injector();
    let called = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&called);

    let handler = Function::returning("fn handle_request(userServise)", move |_: &Arguments| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let err = injector.inject(handler, &Overrides::new()).unwrap_err();

    match err.downcast_ref::<AutowireError>() {
        Some(AutowireError::UnresolvedDependency {
            parameter,
            function,
            file,
            suggestion,
        }) => {
            assert_eq!(parameter, "userServise");
            assert_eq!(function, "handle_request");
            assert!(file.ends_with("main.rs"));
            assert_eq!(suggestion.as_deref(), Some("userService"));
        }
        other => panic!("expected an unresolved dependency, got {other:?}"),
    }
    assert!(err.to_string().contains("userServise"));
    assert_eq!(called.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_unsafe_mode_calls_with_gaps() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/logger.json", r#"{ "level": "info" }"#)?;
    let injector = project.injector().with_safe(false);

    let start = Function::returning("fn start(logger, metrics)", |args: &Arguments| {
        Ok((args.get("logger").is_some(), args.is_missing("metrics")))
    });
    let result = injector.inject(start, &Overrides::new())?;

    assert_eq!(result.downcast_ref::<(bool, bool)>(), Some(&(true, true)));
    Ok(())
}

#[test]
fn test_deep_injection_reaches_nested_instances() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    injector.registry().wire("config", json!({ "env": "wired" }));
    injector.registry().wire_class(
        "service",
        Class::new("impl Service { fn new(config) }", |args: &Arguments| {
            Ok(Service {
                config: args.require::<serde_json::Value>("config")?.clone(),
            })
        }),
        false,
    )?;

    let handler = || Function::new("fn handler(service)", |args: &Arguments| {
        Ok(args.get("service").cloned().unwrap_or_else(|| Dependency::value(())))
    });
    let overrides = Overrides::new().with("config", json!({ "env": "override" }));

    let shallow = injector.inject(handler(), &overrides)?;
    assert_eq!(shallow.downcast_ref::<Service>().map(|s| &s.config), Some(&json!({ "env": "wired" })));

    let deep = injector.with_deep_inject(true).inject(handler(), &overrides)?;
    assert_eq!(deep.downcast_ref::<Service>().map(|s| &s.config), Some(&json!({ "env": "override" })));
    Ok(())
}

#[test]
fn test_injecting_a_class_builds_a_fresh_instance() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/database-url.json", r#""postgres://localhost/app""#)?;
    let injector = project.injector();
    let built = Arc::new(AtomicUsize::new(0));
    let class: Dependency = counting_class("impl Repo { fn new(databaseUrl) }", &built)
        .with_autowire(AutowireMeta::instantiate().singleton(true))
        .into();

    let first = injector.inject(class.clone(), &Overrides::new())?;
    let second = injector.inject(class.clone(), &Overrides::new())?;

    assert!(!first.ptr_eq(&second));
    assert!(first.as_instance().is_some_and(|i| i.is_instance_of(&class)));
    assert_eq!(built.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn test_autowire_ids_tag_values_and_instances() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/settings.json", "{}")?;
    let injector = project.injector().with_autowire_id(true);
    injector.registry().wire_class("clock", Class::new("impl Clock { fn new() }", |_: &Arguments| Ok(())), false)?;

    let clock = injector.get_instance("clock", &Overrides::new())?.expect("clock");
    let tag = clock.as_instance().and_then(|i| i.tag().copied()).expect("instance tag");
    assert!(tag.instance);

    injector.get_instance("settings", &Overrides::new())?;
    let value_tag = injector.registry().tag("settings").expect("value tag");
    assert!(!value_tag.instance);
    assert_ne!(tag.id, value_tag.id);

    // tags are left off by default
    let untagged = project.injector();
    untagged.registry().wire_class("clock", Class::new("impl Clock { fn new() }", |_: &Arguments| Ok(())), false)?;
    let clock = untagged.get_instance("clock", &Overrides::new())?.expect("clock");
    assert!(clock.as_instance().is_some_and(|i| i.tag().is_none()));
    Ok(())
}

#[test]
fn test_alias_shares_the_target_singleton() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    let built = Arc::new(AtomicUsize::new(0));
    injector.registry().wire_class("heavyLib", counting_class("impl HeavyLib { fn new() }", &built), true)?;
    injector.registry().alias("u", "heavyLib")?;

    let via_alias = injector.get_instance("u", &Overrides::new())?.expect("aliased singleton");
    let direct = injector.get_instance("heavyLib", &Overrides::new())?.expect("singleton");
    assert!(via_alias.ptr_eq(&direct));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_alias_and_target_in_one_signature() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    let built = Arc::new(AtomicUsize::new(0));
    injector.registry().wire_class("pool", counting_class("impl Pool { fn new() }", &built), true)?;
    injector.registry().alias("pool2", "pool")?;

    let same = Function::returning("fn f(pool, pool2)", |args: &Arguments| {
        let pool = args.get("pool").ok_or_else(|| anyhow::anyhow!("no pool"))?;
        let pool2 = args.get("pool2").ok_or_else(|| anyhow::anyhow!("no pool2"))?;
        Ok(pool.ptr_eq(pool2))
    });
    let result = injector.inject(same, &Overrides::new())?;

    assert_eq!(result.downcast_ref::<bool>(), Some(&true));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_modules_are_imported_once() -> Result<()> {
    let project = TestProject::new()?;
    project.write("src/settings.json", r#"{ "port": 8080 }"#)?;
    let loader = Arc::new(CountingLoader {
        table: ModuleTable::new(),
        packages: AtomicUsize::new(0),
        paths: AtomicUsize::new(0),
    });
    let registry = Registry::with_loader(project.path(), RegistryOptions::default(), loader.clone());
    let injector = Injector::new(Arc::new(registry));

    let port: Dependency = Function::returning("fn port(settings)", |args: &Arguments| {
        let settings = args.require::<serde_json::Value>("settings")?;
        Ok(settings["port"].as_u64())
    })
    .into();
    let first = injector.inject(port.clone(), &Overrides::new())?;
    let second = injector.inject(port, &Overrides::new())?;

    assert_eq!(first.downcast_ref::<Option<u64>>(), Some(&Some(8080)));
    assert_eq!(second.downcast_ref::<Option<u64>>(), Some(&Some(8080)));
    assert_eq!(loader.paths.load(Ordering::SeqCst), 1);
    assert_eq!(loader.packages.load(Ordering::SeqCst), 1);
    Ok(())
}
