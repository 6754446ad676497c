use loadstar::{
    Exports, LoaderConfig, LoaderError, ModuleFactory, ModuleLoader,
    catalog::{CatalogConfig, PackageDescriptor, ResourceDescriptor},
    environment::json::JsonModuleEnvironment,
    fetch::{FetchFailure, LocationStatus, deferred::DeferredTransport, memory::MemoryTransport},
    loader::events::{LoaderEvent, LoaderEventKind},
    store::{PersistentStore, memory::MemoryStore},
};
use serde_json::json;
use std::{
    cell::{Cell, RefCell},
    error::Error,
    rc::Rc,
    sync::{Arc, mpsc::channel},
    time::Duration,
};

#[derive(Default, Clone)]
struct Outcome {
    completed: Rc<RefCell<Vec<Vec<Exports>>>>,
    errors: Rc<RefCell<Vec<LoaderError>>>,
}

impl Outcome {
    fn resolve(&self, loader: &mut ModuleLoader, ids: &[&str]) {
        let completed = self.completed.clone();
        let errors = self.errors.clone();
        loader.resolve(
            ids,
            move |_, exports| completed.borrow_mut().push(exports),
            move |_, error| errors.borrow_mut().push(error),
        );
    }

    fn completed(&self) -> Vec<Vec<Exports>> {
        self.completed.borrow().clone()
    }

    fn errors(&self) -> Vec<LoaderError> {
        self.errors.borrow().clone()
    }
}

fn catalog_a_b() -> CatalogConfig {
    CatalogConfig::default()
        .resource("a", ResourceDescriptor::new("a.js").dependency("b"))
        .resource("b", ResourceDescriptor::new("b.js"))
}

fn transport_a_b() -> MemoryTransport {
    MemoryTransport::default()
        .with("a.js", r#"{ "a": { "name": "a" } }"#)
        .with("b.js", r#"{ "b": { "name": "b" } }"#)
}

fn loader(transport: &MemoryTransport) -> ModuleLoader {
    ModuleLoader::new(transport.clone(), JsonModuleEnvironment::default())
}

fn drain(loader: &mut ModuleLoader) {
    while loader.is_busy() {
        loader.maintain();
    }
}

#[test]
fn test_request_is_memoized() {
    let transport = MemoryTransport::default();
    let mut loader = loader(&transport);
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    loader.define(
        "counter",
        ModuleFactory::callable(move |_, exports| {
            counter.set(counter.get() + 1);
            exports.insert("value".to_owned(), json!(42));
            Ok(None)
        }),
    );

    let first = loader.request("counter").unwrap();
    let second = loader.request("counter").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first["value"], 42);
    assert_eq!(calls.get(), 1);
    assert_eq!(
        loader.request("missing"),
        Err(LoaderError::ModuleNotFound("missing".into()))
    );
}

#[test]
fn test_concurrent_resolves_share_one_fetch() {
    let transport = transport_a_b();
    transport.hold("b.js");
    let mut loader = loader(&transport).with_catalog(catalog_a_b());
    let outcome = Outcome::default();

    for _ in 0..3 {
        outcome.resolve(&mut loader, &["b"]);
    }
    assert_eq!(transport.dispatch_count("b.js"), 1);
    assert!(loader.pending_ids().any(|id| id.as_str() == "b"));
    assert!(outcome.completed().is_empty());

    transport.release("b.js");
    drain(&mut loader);

    let completed = outcome.completed();
    assert_eq!(completed.len(), 3);
    assert!(Arc::ptr_eq(&completed[0][0], &completed[2][0]));
    assert_eq!(transport.dispatch_count("b.js"), 1);
    assert_eq!(loader.pending_ids().count(), 0);
    assert!(outcome.errors().is_empty());
}

#[test]
fn test_exports_follow_requested_order() {
    let transport = MemoryTransport::default()
        .with("a.js", r#"{ "a": "first" }"#)
        .with("b.js", r#"{ "b": "second" }"#);
    transport.hold("a.js");
    transport.hold("b.js");
    let mut loader = loader(&transport).with_catalog(
        CatalogConfig::default()
            .resource("a", ResourceDescriptor::new("a.js"))
            .resource("b", ResourceDescriptor::new("b.js")),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a", "b"]);

    transport.release("b.js");
    loader.maintain();
    assert!(outcome.completed().is_empty());

    transport.release("a.js");
    loader.maintain();
    let completed = outcome.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(*completed[0][0], json!("first"));
    assert_eq!(*completed[0][1], json!("second"));
}

#[test]
fn test_concrete_scenario() {
    let transport = transport_a_b();
    transport.hold("a.js");
    transport.hold("b.js");
    let mut loader = loader(&transport).with_catalog(catalog_a_b());
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    assert_eq!(transport.dispatch_count("a.js"), 1);
    assert_eq!(transport.dispatch_count("b.js"), 1);

    transport.release("a.js");
    loader.maintain();
    assert!(loader.registry.is_defined("a"));
    assert!(outcome.completed().is_empty());

    transport.release("b.js");
    loader.maintain();
    let completed = outcome.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].len(), 1);
    assert_eq!(completed[0][0]["name"], "a");
    assert!(outcome.errors().is_empty());
}

#[test]
fn test_failure_scenario() {
    let transport = transport_a_b();
    transport.hold("b.js");
    let mut loader = loader(&transport)
        .with_config(LoaderConfig::default().with_timeout(Duration::ZERO))
        .with_catalog(catalog_a_b());
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);
    assert!(loader.registry.is_defined("a"));

    loader.maintain();
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        LoaderError::FetchTimeout { id, location, .. } if id.as_str() == "b" && location == "b.js"
    ));

    transport.release("b.js");
    loader.maintain();
    loader.maintain();
    assert_eq!(outcome.errors().len(), 1);
    assert!(outcome.completed().is_empty());
    assert!(!loader.registry.is_defined("b"));
}

#[test]
fn test_late_completion_is_ignored() {
    let transport = transport_a_b();
    transport.hold("b.js");
    let mut loader = loader(&transport)
        .with_config(LoaderConfig::default().with_timeout(Duration::ZERO))
        .with_catalog(catalog_a_b());
    let (tx, rx) = channel::<LoaderEvent>();
    loader.events.bind(tx);
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["b"]);
    loader.maintain();
    assert_eq!(loader.fetch_coordinator().detached_count(), 1);

    transport.release("b.js");
    loader.maintain();
    assert_eq!(loader.fetch_coordinator().detached_count(), 0);
    assert!(!loader.registry.is_defined("b"));
    assert_eq!(
        loader.fetch_coordinator().location_status("b.js"),
        Some(LocationStatus::Failed(FetchFailure::Timeout(Duration::ZERO)))
    );

    let kinds = rx.try_iter().map(|event| event.kind).collect::<Vec<_>>();
    assert!(kinds.contains(&LoaderEventKind::FetchTimedOut));
    assert!(kinds.contains(&LoaderEventKind::LateCompletionIgnored));
    assert!(!kinds.contains(&LoaderEventKind::Delivered));

    // Failed locations are never retried.
    outcome.resolve(&mut loader, &["b"]);
    assert_eq!(outcome.errors().len(), 2);
    assert_eq!(transport.dispatch_count("b.js"), 1);
}

#[test]
fn test_completion_after_deadline_between_ticks_times_out() {
    let transport = DeferredTransport::new(|location: &str| -> Result<String, String> {
        std::thread::sleep(Duration::from_millis(50));
        Ok(format!(r#"{{ "{}": {{}} }}"#, location.trim_end_matches(".js")))
    });
    let mut loader = ModuleLoader::new(transport, JsonModuleEnvironment::default())
        .with_config(LoaderConfig::default().with_timeout(Duration::from_millis(10)));
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    // The job finishes well after the deadline, before the loader ticks again.
    std::thread::sleep(Duration::from_millis(200));
    loader.maintain();

    assert!(outcome.completed().is_empty());
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        LoaderError::FetchTimeout { id, location, .. } if id.as_str() == "a" && location == "a"
    ));
    assert!(!loader.registry.is_defined("a"));

    loader.maintain();
    assert_eq!(loader.fetch_coordinator().detached_count(), 0);
    assert!(!loader.registry.is_defined("a"));
    assert_eq!(outcome.errors().len(), 1);
}

#[test]
fn test_transport_failure() {
    let transport = MemoryTransport::default();
    let mut loader = loader(&transport);
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["missing.js"]);
    outcome.resolve(&mut loader, &["missing.js"]);

    let errors = outcome.errors();
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        &errors[0],
        LoaderError::UnknownTransport { id, .. } if id.as_str() == "missing.js"
    ));
    assert_eq!(errors[0], errors[1]);
    assert_eq!(transport.dispatch_count("missing.js"), 1);
}

#[test]
fn test_execution_failure_and_missing_definition() {
    let transport = MemoryTransport::default()
        .with("broken.js", "not a module")
        .with("other.js", r#"{ "other": true }"#);
    let mut loader = loader(&transport).with_catalog(
        CatalogConfig::default()
            .resource("broken", ResourceDescriptor::new("broken.js"))
            .resource("lost", ResourceDescriptor::new("other.js")),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["broken"]);
    outcome.resolve(&mut loader, &["lost"]);

    let errors = outcome.errors();
    assert!(matches!(&errors[0], LoaderError::Execution { id, .. } if id.as_str() == "broken"));
    assert_eq!(
        errors[1],
        LoaderError::NotDefined {
            id: "lost".into(),
            location: "other.js".to_owned()
        }
    );
    assert!(loader.registry.is_defined("other"));
}

#[test]
fn test_package_is_fetched_once() {
    let transport =
        MemoryTransport::default().with("core.js", r#"{ "x": "x", "y": "y", "z": "z" }"#);
    transport.hold("core.js");
    let mut loader = loader(&transport).with_catalog(
        CatalogConfig::default()
            .package("core", PackageDescriptor::new("core.js"))
            .resource("x", ResourceDescriptor::in_package("core").dependency("z"))
            .resource("y", ResourceDescriptor::in_package("core"))
            .resource("z", ResourceDescriptor::in_package("core")),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["y", "x"]);
    transport.release("core.js");
    drain(&mut loader);

    assert_eq!(transport.total_dispatches(), 1);
    assert!(loader.registry.is_defined("z"));
    let completed = outcome.completed();
    assert_eq!(*completed[0][0], json!("y"));
    assert_eq!(*completed[0][1], json!("x"));
}

#[test]
fn test_declared_cycle_still_resolves() {
    let transport = MemoryTransport::default()
        .with("a.js", r#"{ "a": 1 }"#)
        .with("b.js", r#"{ "b": 2 }"#);
    let mut loader = loader(&transport).with_catalog(
        CatalogConfig::default()
            .resource("a", ResourceDescriptor::new("a.js").dependency("b"))
            .resource("b", ResourceDescriptor::new("b.js").dependency("a")),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    assert_eq!(outcome.completed().len(), 1);
    assert_eq!(transport.total_dispatches(), 2);
}

#[test]
fn test_instantiation_cycle_fails_resolution() {
    let transport = MemoryTransport::default();
    let mut loader = loader(&transport);
    loader.define(
        "a",
        ModuleFactory::callable(|registry, _| Ok(Some((*registry.request("b")?).clone()))),
    );
    loader.define(
        "b",
        ModuleFactory::callable(|registry, _| Ok(Some((*registry.request("a")?).clone()))),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    assert!(outcome.completed().is_empty());
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        LoaderError::CyclicDependency { chain, .. } if chain.len() == 3
    ));
    assert_eq!(transport.total_dispatches(), 0);
}

#[test]
fn test_registered_modules_resolve_synchronously() {
    let transport = MemoryTransport::default();
    let mut loader = loader(&transport);
    loader.define("config", json!({ "debug": true }));
    loader.define(
        "app",
        ModuleFactory::callable(|registry, exports| {
            let config = registry.request("config")?;
            exports.insert("debug".to_owned(), config["debug"].clone());
            Ok(None)
        }),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["app"]);

    assert_eq!(outcome.completed()[0][0]["debug"], true);
    assert_eq!(transport.total_dispatches(), 0);
    assert!(!loader.is_busy());
}

#[test]
fn test_styles_are_terminal() {
    let transport = MemoryTransport::default()
        .with("theme.css", "body { color: red; }")
        .with("a.js", r#"{ "a": 1 }"#);
    let environment = JsonModuleEnvironment::default();
    let mut loader = ModuleLoader::new(transport.clone(), environment.clone()).with_catalog(
        CatalogConfig::default()
            .resource("theme", ResourceDescriptor::new("theme.css"))
            .resource("a", ResourceDescriptor::new("a.js").dependency("theme")),
    );
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["theme", "a"]);
    outcome.resolve(&mut loader, &["theme"]);

    let completed = outcome.completed();
    assert_eq!(completed.len(), 2);
    assert!(completed[0][0].is_null());
    assert_eq!(*completed[0][1], json!(1));
    assert_eq!(environment.attached_styles(), vec!["theme.css".to_owned()]);
    assert_eq!(transport.dispatch_count("theme.css"), 1);
    assert!(!loader.registry.is_defined("theme"));
}

#[test]
fn test_define_drains_waiters_in_order() {
    let transport = MemoryTransport::default().with("late.js", r#"{ "late": 0 }"#);
    transport.hold("late.js");
    let mut loader = loader(&transport);
    let log = Rc::new(RefCell::new(vec![]));
    for index in 0..3 {
        let log = log.clone();
        loader.fetch(
            "late.js",
            move |_| log.borrow_mut().push(index),
            |_, error| panic!("{error}"),
        );
    }
    assert!(log.borrow().is_empty());

    loader.define("late.js", json!("manual"));
    assert_eq!(*log.borrow(), vec![0, 1, 2]);

    transport.release("late.js");
    drain(&mut loader);
    assert_eq!(*loader.request("late.js").unwrap(), json!("manual"));
}

#[test]
fn test_callbacks_can_reenter_loader() {
    let transport = transport_a_b();
    let mut loader = loader(&transport).with_catalog(catalog_a_b());
    let names = Rc::new(RefCell::new(vec![]));
    let output = names.clone();
    loader.resolve(
        "b",
        move |loader, exports| {
            output.borrow_mut().push(exports[0]["name"].clone());
            let output = output.clone();
            loader.resolve(
                vec!["a"],
                move |_, exports| output.borrow_mut().push(exports[0]["name"].clone()),
                |_, error| panic!("{error}"),
            );
        },
        |_, error| panic!("{error}"),
    );
    drain(&mut loader);
    assert_eq!(*names.borrow(), vec![json!("b"), json!("a")]);
}

#[test]
fn test_cache_invalidation() {
    let store = MemoryStore::default();
    let transport = MemoryTransport::default()
        .with("x-1.js", r#"{ "x": 1 }"#)
        .with("x-2.js", r#"{ "x": 2 }"#);

    let mut first = loader(&transport)
        .with_store(store.clone())
        .with_catalog(CatalogConfig::default().resource("x", ResourceDescriptor::new("x-1.js")));
    Outcome::default().resolve(&mut first, &["x"]);
    assert!(store.contains("x-1.js"));
    assert_eq!(store.get("x").unwrap().as_deref(), Some("x-1.js"));

    let mut second = loader(&transport)
        .with_store(store.clone())
        .with_catalog(CatalogConfig::default().resource("x", ResourceDescriptor::new("x-2.js")));
    let outcome = Outcome::default();
    outcome.resolve(&mut second, &["x"]);

    assert_eq!(*outcome.completed()[0][0], json!(2));
    assert!(!store.contains("x-1.js"));
    assert_eq!(store.get("x-2.js").unwrap().as_deref(), Some(r#"{ "x": 2 }"#));
    assert_eq!(store.get("x").unwrap().as_deref(), Some("x-2.js"));
}

#[test]
fn test_cache_hit_skips_transport() {
    let store = MemoryStore::default().with("a.js", r#"{ "a": "cached" }"#);
    let transport = MemoryTransport::default().with("a.js", r#"{ "a": "fresh" }"#);
    let mut loader = loader(&transport)
        .with_store(store.clone())
        .with_config(LoaderConfig::default().with_cache_prefix("app:"))
        .with_catalog(CatalogConfig::default().resource("a", ResourceDescriptor::new("a.js")));
    let (tx, rx) = channel::<LoaderEvent>();
    loader.events.bind(tx);
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    assert_eq!(*outcome.completed()[0][0], json!("cached"));
    assert_eq!(transport.total_dispatches(), 0);
    assert_eq!(store.get("app:a").unwrap().as_deref(), Some("a.js"));
    assert!(!store.contains("a"));
    assert!(
        rx.try_iter()
            .any(|event| event.kind == LoaderEventKind::CacheHit)
    );
}

#[test]
fn test_direct_delivery_leaves_store_untouched() {
    let store = MemoryStore::default();
    let transport = transport_a_b();
    let mut loader = loader(&transport)
        .with_store(store.clone())
        .with_config(LoaderConfig::default().with_cache_assisted(false))
        .with_catalog(catalog_a_b());
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["a"]);

    assert_eq!(outcome.completed().len(), 1);
    assert!(store.is_empty());
}

#[test]
fn test_preload_registers_bundled_modules() {
    let transport = MemoryTransport::default().with("bundle.js", r#"{ "x": 1, "y": 2 }"#);
    transport.hold("bundle.js");
    let mut loader = loader(&transport).with_catalog(
        CatalogConfig::default()
            .resource("x", ResourceDescriptor::new("bundle.js"))
            .resource("y", ResourceDescriptor::new("bundle.js")),
    );
    loader.preload("bundle.js");
    let outcome = Outcome::default();
    outcome.resolve(&mut loader, &["x", "y"]);
    assert!(outcome.completed().is_empty());

    transport.release("bundle.js");
    drain(&mut loader);
    assert_eq!(outcome.completed().len(), 1);
    assert_eq!(transport.dispatch_count("bundle.js"), 1);
}

#[test]
fn test_events_follow_loading() {
    let transport = transport_a_b();
    let mut loader = loader(&transport).with_catalog(catalog_a_b());
    let (tx, rx) = channel::<LoaderEvent>();
    loader.events.bind(tx);
    let once = Rc::new(Cell::new(0));
    let counter = once.clone();
    loader.events.bind_once(move |_: LoaderEvent| -> Result<(), Box<dyn Error>> {
        counter.set(counter.get() + 1);
        Ok(())
    });
    Outcome::default().resolve(&mut loader, &["a"]);

    let events = rx.try_iter().collect::<Vec<_>>();
    let kinds = events.iter().map(|event| event.kind).collect::<Vec<_>>();
    assert_eq!(kinds[0], LoaderEventKind::Dispatched);
    assert_eq!(events[0].location.as_deref(), Some("a.js"));
    assert_eq!(
        kinds
            .iter()
            .filter(|kind| **kind == LoaderEventKind::Delivered)
            .count(),
        2
    );
    assert_eq!(
        events
            .iter()
            .filter(|event| event.kind == LoaderEventKind::Defined)
            .filter_map(|event| event.id.as_ref().map(|id| id.to_string()))
            .collect::<Vec<_>>(),
        vec!["a".to_owned(), "b".to_owned()]
    );
    assert_eq!(kinds.last(), Some(&LoaderEventKind::Resolved));
    assert_eq!(once.get(), 1);
    assert_eq!(loader.events.len(), 1);
}
