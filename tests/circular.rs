use std::sync::Arc;

use wirebox::{Blueprint, Container, DiError, Lazy, RegisterOptions, Token};

#[test]
fn self_referential_target_is_detected() {
    #[derive(Debug)]
    struct Selfish;

    let container = Container::new();
    container
        .register(
            Blueprint::of::<Selfish>()
                .with_dependency(Token::name("selfish"))
                .constructed_by(|args| {
                    let _me = args.take::<Selfish>()?;
                    Ok(Selfish)
                }),
            RegisterOptions::new().named("selfish"),
        )
        .unwrap();

    let err = container.resolve_named::<Selfish>("selfish").unwrap_err();
    match err {
        DiError::CircularDependency { path } => {
            assert_eq!(path, vec!["selfish".to_string(), "selfish".to_string()]);
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn two_node_cycle_reports_the_full_path() {
    #[derive(Debug)]
    struct A;
    struct B;

    let container = Container::new();
    container
        .register(
            Blueprint::of::<A>()
                .with_dependency(Token::name("b"))
                .constructed_by(|args| {
                    let _b = args.take::<B>()?;
                    Ok(A)
                }),
            RegisterOptions::new().named("a"),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<B>()
                .with_dependency(Token::name("a"))
                .constructed_by(|args| {
                    let _a = args.take::<A>()?;
                    Ok(B)
                }),
            RegisterOptions::new().named("b"),
        )
        .unwrap();

    let err = container.resolve_named::<A>("a").unwrap_err();
    match err {
        DiError::CircularDependency { path } => {
            assert_eq!(path, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[test]
fn cycle_fails_before_any_instance_is_constructed() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct A;
    struct B;

    let container = Container::new();
    container
        .register(
            Blueprint::of::<A>()
                .with_dependency(Token::name("b"))
                .constructed_by(|args| {
                    let _b = args.take::<B>()?;
                    CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                    Ok(A)
                }),
            RegisterOptions::new().named("a"),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<B>()
                .with_dependency(Token::name("a"))
                .constructed_by(|args| {
                    let _a = args.take::<A>()?;
                    CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
                    Ok(B)
                }),
            RegisterOptions::new().named("b"),
        )
        .unwrap();

    assert!(container.resolve_named::<A>("a").is_err());
    assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 0);
}

#[test]
fn deferred_token_loop_is_a_circular_reference() {
    struct Anything;

    let container = Container::new();
    container
        .register(Blueprint::from_factory(|| Anything), RegisterOptions::new().named("anything"))
        .unwrap();

    let slot: Arc<parking_lot::Mutex<Option<Token>>> = Arc::new(parking_lot::Mutex::new(None));
    let producer_slot = slot.clone();
    let token = Token::deferred(move || producer_slot.lock().clone().expect("slot filled"));
    *slot.lock() = Some(token.clone());

    let err = container.resolve_token(token, &Default::default()).unwrap_err();
    assert!(matches!(err, DiError::CircularReference { .. }));
}

#[test]
fn lazy_dependency_breaks_a_mutual_cycle() {
    struct Engine {
        driver: Lazy<Driver>,
    }
    struct Driver {
        engine: Arc<Engine>,
    }

    let container = Container::new();
    container
        .register(
            Blueprint::of::<Engine>()
                .with_lazy_dependency(Token::name("driver"))
                .constructed_by(|args| {
                    Ok(Engine {
                        driver: args.take_lazy::<Driver>()?,
                    })
                }),
            RegisterOptions::new().named("engine"),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Driver>()
                .with_dependency(Token::name("engine"))
                .constructed_by(|args| {
                    Ok(Driver {
                        engine: args.take::<Engine>()?,
                    })
                }),
            RegisterOptions::new().named("driver"),
        )
        .unwrap();

    let engine = container.resolve_named::<Engine>("engine").unwrap();
    let driver = engine.driver.get().unwrap();
    assert!(Arc::ptr_eq(&driver.engine, &engine));
}
