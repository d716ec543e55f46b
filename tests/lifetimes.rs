use std::sync::{Arc, Mutex};

use wirebox::{
    Blueprint, Container, DiError, Lifetime, RegisterOptions, ResolveOptions, Token,
};

#[test]
fn singleton_may_not_depend_on_scoped_directly() {
    struct SessionState;
    #[derive(Debug)]
    struct Greedy;

    let container = Container::new();
    container
        .register(
            Blueprint::from_factory(|| SessionState),
            RegisterOptions::new().named("state").lifetime(Lifetime::Scoped),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Greedy>()
                .with_dependency(Token::name("state"))
                .constructed_by(|args| {
                    let _state = args.take::<SessionState>()?;
                    Ok(Greedy)
                }),
            RegisterOptions::new().named("greedy"),
        )
        .unwrap();

    // No session is active, but the violation wins either way.
    let err = container.resolve_named::<Greedy>("greedy").unwrap_err();
    match err {
        DiError::LifecycleViolation { consumer, dependency } => {
            assert_eq!(consumer, "greedy");
            assert_eq!(dependency, "state");
        }
        other => panic!("expected LifecycleViolation, got {other:?}"),
    }
}

#[test]
fn singleton_may_not_depend_on_scoped_transitively() {
    struct SessionState;
    struct Middle;
    #[derive(Debug)]
    struct Greedy;

    let container = Container::new();
    container
        .register(
            Blueprint::from_factory(|| SessionState),
            RegisterOptions::new().named("state").lifetime(Lifetime::Scoped),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Middle>()
                .with_dependency(Token::name("state"))
                .constructed_by(|args| {
                    let _state = args.take::<SessionState>()?;
                    Ok(Middle)
                }),
            RegisterOptions::new().named("middle").lifetime(Lifetime::Transient),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Greedy>()
                .with_dependency(Token::name("middle"))
                .constructed_by(|args| {
                    let _middle = args.take::<Middle>()?;
                    Ok(Greedy)
                }),
            RegisterOptions::new().named("greedy"),
        )
        .unwrap();

    let session = container.create_session(None);
    let options = ResolveOptions::new().in_session(session.id);
    let err = container.resolve_with::<Greedy, _>("greedy", &options).unwrap_err();
    match err {
        DiError::LifecycleViolation { consumer, dependency } => {
            assert_eq!(consumer, "greedy");
            assert_eq!(dependency, "state");
        }
        other => panic!("expected LifecycleViolation, got {other:?}"),
    }
}

#[test]
fn scoped_under_transient_is_allowed() {
    struct SessionState;
    struct Worker {
        state: Arc<SessionState>,
    }

    let container = Container::new();
    container
        .register(
            Blueprint::from_factory(|| SessionState),
            RegisterOptions::new().named("state").lifetime(Lifetime::Scoped),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Worker>()
                .with_dependency(Token::name("state"))
                .constructed_by(|args| {
                    Ok(Worker {
                        state: args.take::<SessionState>()?,
                    })
                }),
            RegisterOptions::new().named("worker").lifetime(Lifetime::Transient),
        )
        .unwrap();

    let session = container.create_session(None);
    let options = ResolveOptions::new().in_session(session.id);

    let a = container.resolve_with::<Worker, _>("worker", &options).unwrap();
    let b = container.resolve_with::<Worker, _>("worker", &options).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.state, &b.state)); // same session, same state
}

#[test]
fn failed_singleton_attempt_leaves_the_slot_empty_and_retries() {
    struct Flaky;

    let attempts = Arc::new(Mutex::new(0));
    let attempts_clone = attempts.clone();

    let container = Container::new();
    container
        .register(
            Blueprint::of::<Flaky>().constructed_by(move |_| {
                let mut n = attempts_clone.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err(DiError::UnresolvableParameter {
                        target: "Flaky",
                        parameter: "#1".to_string(),
                        reason: "upstream warming up".to_string(),
                    })
                } else {
                    Ok(Flaky)
                }
            }),
            RegisterOptions::new().named("flaky"),
        )
        .unwrap();

    assert!(container.resolve_named::<Flaky>("flaky").is_err());

    let registration = &container.list(None)[0];
    assert!(!registration.has_cached_instance());

    let recovered = container.resolve_named::<Flaky>("flaky").unwrap();
    let again = container.resolve_named::<Flaky>("flaky").unwrap();
    assert!(Arc::ptr_eq(&recovered, &again));
    assert_eq!(*attempts.lock().unwrap(), 2);
}

#[test]
fn singleton_is_shared_across_sessions() {
    struct Shared;

    let container = Container::new();
    container
        .register(Blueprint::from_factory(|| Shared), RegisterOptions::new().named("shared"))
        .unwrap();

    let s1 = container.create_session(None);
    let s2 = container.create_session(None);

    let a = container
        .resolve_with::<Shared, _>("shared", &ResolveOptions::new().in_session(s1.id))
        .unwrap();
    let b = container
        .resolve_with::<Shared, _>("shared", &ResolveOptions::new().in_session(s2.id))
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
}
