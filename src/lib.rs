//! # wirebox
//!
//! Token-keyed dependency injection for Rust: a registry mapping opaque
//! tokens (string aliases or type identities) to constructible targets, a
//! resolution engine that wires declared dependency graphs, and lifetime
//! management with process-wide singletons, session-scoped instances and
//! always-fresh transients.
//!
//! ## Features
//!
//! - **Three lifetimes**: Singleton, Scoped (per-session), Transient
//! - **Token or type lookup**: resolve by string alias or by the type itself
//! - **Declared dependencies**: explicit blueprints instead of reflection —
//!   ordered constructor tokens, named properties, optional and lazy flags
//! - **Ambient sessions**: `run_in_session` propagates the current session
//!   through nested async calls via a task-local; concurrent sessions never
//!   leak into each other
//! - **Container hierarchy**: child containers fall back to their parent,
//!   gated by include/exclude token filters
//! - **Guard rails**: circular-dependency detection with full paths, and a
//!   lifetime-capture check that stops singletons from swallowing scoped
//!   instances
//! - **Observability**: structured events (`resolve:start`, `resolve:success`,
//!   `resolve:error`, `instantiate`, `dispose`, `stats:change`) cascading up
//!   the hierarchy, plus aggregate statistics
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use wirebox::{Blueprint, Container, Lifetime, RegisterOptions, Token};
//!
//! struct Repo;
//!
//! struct Service {
//!     repo: Arc<Repo>,
//! }
//!
//! let container = Container::new();
//!
//! // A singleton repository, addressable by name.
//! container
//!     .register(Blueprint::from_factory(|| Repo), RegisterOptions::new().named("repo"))
//!     .unwrap();
//!
//! // A transient service depending on it.
//! container
//!     .register(
//!         Blueprint::of::<Service>()
//!             .with_dependency(Token::name("repo"))
//!             .constructed_by(|args| Ok(Service { repo: args.take::<Repo>()? })),
//!         RegisterOptions::new().lifetime(Lifetime::Transient),
//!     )
//!     .unwrap();
//!
//! let a = container.resolve::<Service>().unwrap();
//! let b = container.resolve::<Service>().unwrap();
//! assert!(!Arc::ptr_eq(&a, &b)); // transients are fresh
//! assert!(Arc::ptr_eq(&a.repo, &b.repo)); // the singleton repo is shared
//! ```
//!
//! ## Sessions
//!
//! Scoped registrations cache one instance per session. The session is
//! ambient: nothing inside the callback has to pass it along.
//!
//! ```rust
//! use wirebox::{Blueprint, Container, Lifetime, RegisterOptions};
//!
//! struct RequestContext;
//!
//! let container = Container::new();
//! container
//!     .register(
//!         Blueprint::from_factory(|| RequestContext),
//!         RegisterOptions::new().named("ctx").lifetime(Lifetime::Scoped),
//!     )
//!     .unwrap();
//!
//! let outcome = container
//!     .run_in_scope_sync("http", |_session| {
//!         let first = container.resolve_named::<RequestContext>("ctx").unwrap();
//!         let second = container.resolve_named::<RequestContext>("ctx").unwrap();
//!         std::sync::Arc::ptr_eq(&first, &second)
//!     })
//!     .unwrap();
//! assert!(outcome); // same instance within the session
//! ```

pub mod blueprint;
pub mod container;
pub mod dispose;
pub mod error;
pub mod events;
pub mod lifetime;
pub mod module;
pub mod registration;
pub mod session;
pub mod token;

mod internal;

pub use blueprint::{AnyArc, Blueprint, BlueprintBuilder, Injected, Lazy, LazySeed, ResolvedArgs};
pub use container::{ChildOptions, Container, ResolveOptions};
pub use dispose::{AsyncDispose, Dispose};
pub use error::{DiError, DiResult};
pub use events::{DiEvent, DiStats, EventKind, Subscription};
pub use lifetime::Lifetime;
pub use module::Module;
pub use registration::{Category, RegisterOptions, Registration};
pub use session::{SessionId, SessionInfo, SessionOptions};
pub use token::{DeferredToken, Token};
