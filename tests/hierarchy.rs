use std::sync::{Arc, Mutex};

use wirebox::{
    Blueprint, Category, ChildOptions, Container, DiError, DiEvent, EventKind, Lifetime,
    RegisterOptions, Token,
};

#[derive(Debug)]
struct Database;

fn parent_with_database() -> Container {
    let container = Container::new();
    container
        .register(Blueprint::from_factory(|| Database), RegisterOptions::new().named("db"))
        .unwrap();
    container
}

#[test]
fn child_falls_back_to_parent() {
    let parent = parent_with_database();
    let child = parent.create_child(ChildOptions::new()).unwrap();

    let from_child = child.resolve_named::<Database>("db").unwrap();
    let from_parent = parent.resolve_named::<Database>("db").unwrap();

    assert!(Arc::ptr_eq(&from_child, &from_parent));
}

#[test]
fn exclude_filter_fences_a_token() {
    let parent = parent_with_database();
    let child = parent
        .create_child(ChildOptions::new().exclude("db"))
        .unwrap();

    let err = child.resolve_named::<Database>("db").unwrap_err();
    assert_eq!(err, DiError::NotAvailableInContainer("db".to_string()));
}

#[test]
fn include_filter_admits_only_listed_tokens() {
    #[derive(Debug)]
    struct Mailer;

    let parent = parent_with_database();
    parent
        .register(Blueprint::from_factory(|| Mailer), RegisterOptions::new().named("mailer"))
        .unwrap();

    let child = parent
        .create_child(ChildOptions::new().include("db"))
        .unwrap();

    assert!(child.resolve_named::<Database>("db").is_ok());
    let err = child.resolve_named::<Mailer>("mailer").unwrap_err();
    assert_eq!(err, DiError::NotAvailableInContainer("mailer".to_string()));
}

#[test]
fn local_registration_shadows_the_parent() {
    struct LocalDatabase;

    let parent = parent_with_database();
    let child = parent.create_child(ChildOptions::new()).unwrap();
    child
        .register(Blueprint::from_factory(|| LocalDatabase), RegisterOptions::new().named("db"))
        .unwrap();

    // The child's own target wins; the parent's instance stays untouched.
    assert!(child.resolve_named::<LocalDatabase>("db").is_ok());
    assert!(parent.resolve_named::<Database>("db").is_ok());
}

#[test]
fn list_merges_parent_and_child_with_child_precedence() {
    struct LocalDatabase;
    struct Worker;

    let parent = parent_with_database();
    let child = parent.create_child(ChildOptions::new()).unwrap();
    child
        .register(Blueprint::from_factory(|| LocalDatabase), RegisterOptions::new().named("db"))
        .unwrap();
    child
        .register(
            Blueprint::from_factory(|| Worker),
            RegisterOptions::new().named("worker").category(Category::Action),
        )
        .unwrap();

    let listed = child.list(None);
    let names: Vec<_> = listed.iter().map(|r| r.token_name().to_string()).collect();
    assert_eq!(names, vec!["db", "worker"]);

    // The "db" entry is the child's registration, not the inherited one.
    let db_entry = listed.iter().find(|r| r.token_name() == "db").unwrap();
    assert_eq!(db_entry.target_type_name(), std::any::type_name::<LocalDatabase>());
}

#[test]
fn list_respects_filters_for_inherited_entries() {
    let parent = parent_with_database();
    let child = parent
        .create_child(ChildOptions::new().exclude("db"))
        .unwrap();

    assert!(child.list(None).is_empty());
}

#[test]
fn events_cascade_from_child_to_parent_despite_filters() {
    let parent = parent_with_database();
    let child = parent
        .create_child(ChildOptions::new().exclude("db"))
        .unwrap();

    struct Local;
    child
        .register(
            Blueprint::from_factory(|| Local),
            RegisterOptions::new().named("local").lifetime(Lifetime::Transient),
        )
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    parent.on(EventKind::ResolveSuccess, move |event| {
        if let DiEvent::ResolveSuccess { token, .. } = event {
            seen_clone.lock().unwrap().push(token.clone());
        }
    });

    child.resolve_named::<Local>("local").unwrap();

    // A root listener observes resolutions happening in descendants, even
    // though the child fenced off registration fallback entirely.
    assert_eq!(*seen.lock().unwrap(), vec!["local".to_string()]);
}

#[test]
fn grandchild_reaches_the_root_registry() {
    let root = parent_with_database();
    let child = root.create_child(ChildOptions::new()).unwrap();
    let grandchild = child.create_child(ChildOptions::new()).unwrap();

    assert!(grandchild.resolve_named::<Database>("db").is_ok());
}

#[test]
fn dropped_parent_turns_fallback_into_not_found() {
    let parent = parent_with_database();
    let child = parent.create_child(ChildOptions::new()).unwrap();
    drop(parent);

    // The child holds only a non-owning reference to its parent.
    let err = child.resolve_named::<Database>("db").unwrap_err();
    assert_eq!(err, DiError::NotFound("db".to_string()));
}

#[test]
fn filters_normalize_type_and_deferred_tokens() {
    #[derive(Debug)]
    struct Typed;

    let parent = Container::new();
    parent
        .register(Blueprint::from_factory(|| Typed), RegisterOptions::new())
        .unwrap();

    // The exclude entry names the type through a deferred reference; it
    // normalizes to the same description the resolver uses.
    let child = parent
        .create_child(ChildOptions::new().exclude(Token::deferred(|| Token::of::<Typed>())))
        .unwrap();

    let err = child.resolve::<Typed>().unwrap_err();
    assert!(matches!(err, DiError::NotAvailableInContainer(_)));
}
