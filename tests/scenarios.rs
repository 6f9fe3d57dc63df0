//! End-to-end registration and resolution scenarios.

use bindery::prelude::*;
use bindery::{DiError, invoker::select_constructor};
use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, PartialEq)]
struct Logger(&'static str);

#[derive(Debug)]
struct Database(&'static str);

fn setup() -> (Container, Registrar) {
    let container = Container::new();
    let registrar = Registrar::new(&container);
    (container, registrar)
}

#[test]
fn test_two_set_members_resolve_to_both() {
    let (container, registrar) = setup();

    registrar
        .register(BindingConfig::into_set(), "ConsoleModule", || Logger("console"))
        .unwrap();
    registrar
        .register(BindingConfig::into_set(), "FileModule", || Logger("file"))
        .unwrap();
    container.freeze();

    let loggers = container.set::<Logger>(None).unwrap();
    let mut names: Vec<_> = loggers.iter().map(|logger| logger.0).collect();
    names.sort_unstable();
    assert_eq!(names, ["console", "file"]);
}

#[test]
fn test_set_contents_do_not_depend_on_order() {
    let names = ["a", "b", "c", "d"];
    let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]];

    for order in orders {
        let (container, registrar) = setup();
        for index in order {
            let name = names[index];
            registrar
                .register(BindingConfig::into_set().singleton(), "Plugins", move || Logger(name))
                .unwrap();
        }
        container.freeze();

        let mut resolved: Vec<_> = container
            .set::<Logger>(None)
            .unwrap()
            .iter()
            .map(|logger| logger.0)
            .collect();
        resolved.sort_unstable();
        assert_eq!(resolved, names);
    }
}

#[test]
fn test_duplicate_factories_yield_duplicate_members() {
    let (container, registrar) = setup();
    for _ in 0..2 {
        registrar
            .register(BindingConfig::into_set(), "Twice", || Logger("same"))
            .unwrap();
    }
    container.freeze();

    assert_eq!(container.set::<Logger>(None).unwrap().len(), 2);
}

#[test]
fn test_tagged_sets_are_separate() {
    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::into_set(), "Default", || Logger("default"))
        .unwrap();
    registrar
        .register(BindingConfig::into_set().tagged("audit"), "Audit", || Logger("audit"))
        .unwrap();
    container.freeze();

    assert_eq!(container.set::<Logger>(None).unwrap().len(), 1);
    let audit = container.set::<Logger>(Some(Tag::from("audit"))).unwrap();
    assert_eq!(audit.iter().next().unwrap().0, "audit");
}

#[test]
fn test_second_single_binding_conflicts() {
    let (container, registrar) = setup();
    let config = || BindingConfig::single().singleton().tagged("primary");

    registrar
        .register(config(), "PrimaryModule", || Database("primary"))
        .unwrap();
    let err = registrar
        .register(config(), "ReplicaModule", || Database("replica"))
        .unwrap_err();

    match err {
        DiError::BindingConflict { key, source_name } => {
            assert_eq!(key, TypeKey::tagged::<Database>("primary"));
            assert_eq!(source_name, "ReplicaModule");
        }
        other => panic!("expected conflict, got {other}"),
    }

    container.freeze();
    assert_eq!(container.get_tagged::<Database>("primary").unwrap().0, "primary");
}

#[test]
fn test_map_and_provider_map_agree() {
    let (container, registrar) = setup();
    for (key, name) in [("console", "c"), ("file", "f"), ("syslog", "s")] {
        registrar
            .register(BindingConfig::into_map(key).singleton(), "Loggers", move || Logger(name))
            .unwrap();
    }
    container.freeze();

    let map = container.map::<&'static str, Logger>(None).unwrap();
    let providers = container.provider_map::<&'static str, Logger>(None).unwrap();

    assert_eq!(map.len(), 3);
    assert_eq!(providers.len(), 3);
    for (key, value) in map.iter() {
        assert!(Arc::ptr_eq(value, &providers.get(key).unwrap().get()));
    }
    assert_eq!(map.get(&"file").unwrap().0, "f");
}

#[test]
fn test_duplicate_map_keys_keep_last_registration() {
    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::into_map(1u32).singleton(), "First", || Logger("one"))
        .unwrap();
    registrar
        .register(BindingConfig::into_map(2u32).singleton(), "Other", || Logger("two"))
        .unwrap();
    registrar
        .register(BindingConfig::into_map(1u32).singleton(), "Second", || Logger("uno"))
        .unwrap();
    container.freeze();

    let map = container.map::<u32, Logger>(None).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&1).unwrap().0, "uno");
    assert_eq!(map.get(&2).unwrap().0, "two");

    let providers = container.provider_map::<u32, Logger>(None).unwrap();
    assert_eq!(providers.get(&1).unwrap().get().0, "uno");
}

struct UserService {
    db: Arc<Database>,
    logger: Arc<Logger>,
}

impl Constructible for UserService {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(
            "UserService::new",
            |db: Arc<Database>, logger: Arc<Logger>| UserService { db, logger },
        )]
    }
}

#[test]
fn test_construct_resolves_parameters() {
    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::single().singleton(), "Db", || Database("main"))
        .unwrap();
    registrar
        .register(BindingConfig::single(), "Log", || Logger("console"))
        .unwrap();
    container.freeze();

    let service = construct::<UserService, _>(&container).unwrap();
    assert_eq!(service.db.0, "main");
    assert_eq!(service.logger.0, "console");
    assert!(Arc::ptr_eq(&service.db, &container.get::<Database>().unwrap()));
}

#[test]
fn test_construct_reports_unresolved_parameter() {
    struct Reporting;

    impl Constructible for Reporting {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(
                "Reporting::new",
                |_: Arc<Database>, _: Arc<Logger>| -> Reporting {
                    panic!("constructor must not run")
                },
            )]
        }
    }

    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::single(), "Log", || Logger("console"))
        .unwrap();
    container.freeze();

    match construct::<Reporting, _>(&container) {
        Err(DiError::UnresolvedDependency { position, key, .. }) => {
            assert_eq!(position, 0);
            assert_eq!(key, TypeKey::of::<Database>());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_registered_constructed_binding() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct AuditService {
        logger: Arc<Logger>,
    }

    impl Constructible for AuditService {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("AuditService::new", |logger: Arc<Logger>| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                AuditService { logger }
            })]
        }
    }

    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::single(), "Log", || Logger("file"))
        .unwrap();
    registrar
        .register_constructed::<AuditService, ()>(BindingConfig::single().singleton(), "Audit")
        .unwrap();
    container.freeze();

    assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    let first = container.get::<AuditService>().unwrap();
    let second = container.get::<AuditService>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.logger.0, "file");
    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}

#[test]
fn test_map_blocked_by_existing_binding_reports_that_key() {
    let (_container, registrar) = setup();
    registrar
        .register_with(BindingConfig::single(), "Legacy", |_: &Container| {
            Err::<Map<u8, Logger>, _>(DiError::creation_failed::<Map<u8, Logger>>("legacy"))
        })
        .unwrap();

    match registrar.register(BindingConfig::into_map(1u8), "Sinks", || Logger("console")) {
        Err(DiError::BindingConflict { key, source_name }) => {
            assert_eq!(key, TypeKey::of::<Map<u8, Logger>>());
            assert_eq!(source_name, "Sinks");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => panic!("registration should conflict"),
    }
}

struct Session(&'static str);

fn session_constructors(mark_first: bool, mark_second: bool) -> Vec<Constructor<Session>> {
    let anonymous = Constructor::new("Session::anonymous", || Session("anonymous"));
    let for_user = Constructor::new("Session::for_user", |logger: Arc<Logger>| Session(logger.0));
    vec![
        if mark_first { anonymous.inject() } else { anonymous },
        if mark_second { for_user.inject() } else { for_user },
    ]
}

#[test]
fn test_constructor_selection() {
    assert!(matches!(
        select_constructor(session_constructors(false, false)),
        Err(DiError::NoInjectableConstructor { .. })
    ));
    assert!(matches!(
        select_constructor(session_constructors(true, true)),
        Err(DiError::AmbiguousConstructor { .. })
    ));

    let chosen = select_constructor(session_constructors(false, true)).unwrap();
    assert_eq!(chosen.callable().name(), "Session::for_user");
}

#[test]
fn test_concurrent_first_resolution_memoizes_singleton() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Expensive(usize);

    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::single().singleton(), "Expensive", || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            Expensive(CALLS.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap();
    container.freeze();

    let threads = 8;
    let barrier = Barrier::new(threads);
    let resolved: Vec<Arc<Expensive>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    container.get::<Expensive>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert!(resolved.iter().all(|e| Arc::ptr_eq(e, &resolved[0])));
    assert_eq!(resolved[0].0, 0);
}

#[test]
fn test_container_lifecycle_is_enforced() {
    let (container, registrar) = setup();
    registrar
        .register(BindingConfig::single(), "Log", || Logger("early"))
        .unwrap();

    assert!(matches!(container.get::<Logger>(), Err(DiError::NotFrozen)));

    container.freeze();
    assert!(matches!(
        registrar.register(BindingConfig::into_set(), "Late", || Logger("late")),
        Err(DiError::Locked)
    ));
}
