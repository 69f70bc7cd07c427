//! Instances, mixins, proxies and cycles.

use anyhow::Result;
use autowire::core::{Arguments, AutowireError, AutowireMeta, Class, Dependency, Function, Overrides};
use autowire::test_utils::TestProject;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Widget {
    title: String,
}

#[derive(Default)]
struct EventEmitter {
    emitted: Mutex<Vec<String>>,
}

fn event_emitter() -> Class {
    Class::new("impl EventEmitter { fn new() }", |_: &Arguments| Ok(EventEmitter::default())).method(
        "emit",
        |this, args| {
            let event = args.require::<&str>("0")?;
            if let Some(emitter) = this.state::<EventEmitter>() {
                emitter.emitted.lock().unwrap_or_else(|e| e.into_inner()).push(event.to_string());
            }
            Ok(Dependency::value(()))
        },
    )
}

fn widget() -> Class {
    Class::new("impl Widget { fn new(title = \"untitled\") }", |args: &Arguments| {
        let title = args.require::<serde_json::Value>("title")?;
        Ok(Widget {
            title: title.as_str().unwrap_or_default().to_string(),
        })
    })
    .method("render", |this, _| {
        let title = this.state::<Widget>().map(|w| w.title.clone()).unwrap_or_default();
        Ok(Dependency::value(format!("<widget>{title}</widget>")))
    })
}

#[test]
fn test_widget_with_mixin_and_proxy() -> Result<()> {
    let project = TestProject::new()?;
    let widget: Dependency = widget()
        .with_autowire(AutowireMeta::instantiate().mixin("eventEmitter").proxy("tracker"))
        .into();
    project.native("src/ui/widget.rs", widget.clone())?;
    project.native("src/events/event-emitter.rs", event_emitter())?;

    let injector = project.injector();
    let proxied = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&proxied);
    injector.registry().wire("trackingLabel", json!("ui"));
    injector.registry().wire(
        "tracker",
        Function::new("fn tracker(target, trackingLabel)", move |args: &Arguments| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert_eq!(args.value::<serde_json::Value>("trackingLabel"), Some(&json!("ui")));
            args.get("target").cloned().ok_or_else(|| anyhow::anyhow!("proxy got no target"))
        }),
    );

    let produced = injector.get_instance("widget", &Overrides::new())?.expect("widget");
    let instance = produced.as_instance().expect("an instance");

    assert!(instance.is_instance_of(&widget));
    assert!(instance.responds_to("render"));
    assert!(instance.responds_to("emit"));
    assert!(!instance.responds_to("fly"));
    assert_eq!(instance.state::<Widget>().map(|w| w.title.as_str()), Some("untitled"));

    let rendered = instance.call("render", &Arguments::new())?;
    assert_eq!(rendered.downcast_ref::<String>().map(String::as_str), Some("<widget>untitled</widget>"));

    instance.call("emit", &Arguments::positional([Dependency::value("clicked")]))?;
    let emitted = instance
        .mixin::<EventEmitter>()
        .map(|e| e.emitted.lock().unwrap_or_else(|e| e.into_inner()).clone());
    assert_eq!(emitted, Some(vec!["clicked".to_string()]));

    assert_eq!(proxied.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_proxy_result_replaces_the_instance() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    injector.registry().wire(
        "describe",
        Function::returning("fn describe(widget)", |args: &Arguments| {
            let title = args.value::<Widget>("widget").map(|w| w.title.clone()).unwrap_or_default();
            Ok(format!("proxied {title}"))
        }),
    );
    injector.registry().wire_class(
        "banner",
        widget().with_autowire(AutowireMeta::default().proxy("describe")),
        false,
    )?;

    let produced = injector.get_instance("banner", &Overrides::new().with("title", json!("sale")))?;
    assert_eq!(produced.as_ref().and_then(|p| p.downcast_ref::<String>()).map(String::as_str), Some("proxied sale"));
    Ok(())
}

#[test]
fn test_unknown_mixin_fails() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    injector.registry().wire_class(
        "panel",
        widget().with_autowire(AutowireMeta::default().mixin("draggable")),
        false,
    )?;

    let err = injector.get_instance("panel", &Overrides::new()).unwrap_err();
    match err.downcast_ref::<AutowireError>() {
        Some(AutowireError::MixinResolution { mixin, target }) => {
            assert_eq!(mixin, "draggable");
            assert_eq!(target, "panel");
        }
        other => panic!("expected a mixin error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_proxy_that_is_not_a_function_fails() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    injector.registry().wire("tracker", json!({ "enabled": true }));
    injector.registry().wire_class("panel", widget().with_autowire(AutowireMeta::default().proxy("tracker")), false)?;

    let err = injector.get_instance("panel", &Overrides::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AutowireError>(),
        Some(AutowireError::ProxyResolution { proxy, target, .. }) if proxy == "tracker" && target == "panel"
    ));
    Ok(())
}

#[test]
fn test_cycles_are_reported() -> Result<()> {
    let project = TestProject::new()?;
    let injector = project.injector();
    injector.registry().wire_class("a", Function::returning("fn a(b)", |_: &Arguments| Ok(())), false)?;
    injector.registry().wire_class("b", Function::returning("fn b(a)", |_: &Arguments| Ok(())), false)?;

    let err = injector.get_instance("a", &Overrides::new()).unwrap_err();
    match err.downcast_ref::<AutowireError>() {
        Some(AutowireError::CircularDependency { chain }) => assert_eq!(chain, "a -> b -> a"),
        other => panic!("expected a cycle, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_mark_as_class_instantiates_a_discovered_function() -> Result<()> {
    let project = TestProject::new()?;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    project.native(
        "src/make-id.rs",
        Function::returning("fn make_id()", move |_: &Arguments| Ok(counter.fetch_add(1, Ordering::SeqCst))),
    )?;

    let injector = project.injector();
    let raw = injector.get_instance("makeId", &Overrides::new())?.expect("function");
    assert!(raw.as_function().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    injector.registry().mark_as_class("makeId", true);
    let first = injector.get_instance("makeId", &Overrides::new())?.expect("instance");
    let second = injector.get_instance("makeId", &Overrides::new())?.expect("instance");
    assert!(first.ptr_eq(&second));
    assert_eq!(first.downcast_ref::<usize>(), Some(&0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}
