use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use wirebox::{
    Blueprint, Container, Lifetime, RegisterOptions, ResolveOptions, Token,
};

fn bench_singleton_hit(c: &mut Criterion) {
    struct Config {
        value: u64,
    }

    let container = Container::new();
    container
        .register(
            Blueprint::from_value(Config { value: 42 }),
            RegisterOptions::new().named("config"),
        )
        .unwrap();

    // Prime the singleton slot.
    let _ = container.resolve_named::<Config>("config").unwrap();

    c.bench_function("singleton_hit", |b| {
        b.iter(|| {
            let config = container.resolve_named::<Config>("config").unwrap();
            black_box(config.value);
        })
    });
}

fn bench_transient_resolution(c: &mut Criterion) {
    struct Payload {
        data: [u8; 64],
    }

    let container = Container::new();
    container
        .register(
            Blueprint::from_factory(|| Payload { data: [0; 64] }),
            RegisterOptions::new().named("payload").lifetime(Lifetime::Transient),
        )
        .unwrap();

    c.bench_function("transient_resolution", |b| {
        b.iter(|| {
            let payload = container.resolve_named::<Payload>("payload").unwrap();
            black_box(payload.data.len());
        })
    });
}

fn bench_scoped_hit(c: &mut Criterion) {
    struct RequestContext {
        id: u64,
    }

    let container = Container::new();
    container
        .register(
            Blueprint::from_factory(|| RequestContext { id: 7 }),
            RegisterOptions::new().named("ctx").lifetime(Lifetime::Scoped),
        )
        .unwrap();

    let session = container.create_session(None);
    let options = ResolveOptions::new().in_session(session.id);

    // Prime the session cache.
    let _ = container.resolve_with::<RequestContext, _>("ctx", &options).unwrap();

    c.bench_function("scoped_hit", |b| {
        b.iter(|| {
            let ctx = container.resolve_with::<RequestContext, _>("ctx", &options).unwrap();
            black_box(ctx.id);
        })
    });
}

fn bench_dependency_graph(c: &mut Criterion) {
    struct Repo;
    struct Service {
        repo: Arc<Repo>,
    }
    struct Handler {
        service: Arc<Service>,
    }

    let container = Container::new();
    container
        .register(Blueprint::from_factory(|| Repo), RegisterOptions::new().named("repo"))
        .unwrap();
    container
        .register(
            Blueprint::of::<Service>()
                .with_dependency(Token::name("repo"))
                .constructed_by(|args| Ok(Service { repo: args.take::<Repo>()? })),
            RegisterOptions::new().named("service").lifetime(Lifetime::Transient),
        )
        .unwrap();
    container
        .register(
            Blueprint::of::<Handler>()
                .with_dependency(Token::name("service"))
                .constructed_by(|args| Ok(Handler { service: args.take::<Service>()? })),
            RegisterOptions::new().named("handler").lifetime(Lifetime::Transient),
        )
        .unwrap();

    c.bench_function("three_level_transient_graph", |b| {
        b.iter(|| {
            let handler = container.resolve_named::<Handler>("handler").unwrap();
            black_box(Arc::strong_count(&handler.service.repo));
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_transient_resolution,
    bench_scoped_hit,
    bench_dependency_graph
);
criterion_main!(benches);
