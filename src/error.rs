//! Error types for the dependency injection container.

use thiserror::Error;

use crate::session::SessionId;

/// Dependency injection errors.
///
/// Every failure is raised at the point of detection and aborts the in-flight
/// operation; nothing is retried automatically. The only swallowed failures
/// are disposal hook panics during teardown, which surface through the
/// `dispose` event instead of propagating.
///
/// # Examples
///
/// ```rust
/// use wirebox::{Container, DiError};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::NotFound(token)) => assert!(token.contains("String")),
///     other => panic!("expected NotFound, got {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Token has no registration anywhere reachable.
    #[error("no registration found for token `{0}`")]
    NotFound(String),

    /// Token exists in an ancestor but is fenced by inheritance filters.
    #[error("token `{0}` is not available in this container (fenced by inheritance filters)")]
    NotAvailableInContainer(String),

    /// Same token already bound to a different target.
    #[error("token `{token}` is already bound to `{existing}`, refusing to rebind to `{requested}`")]
    DuplicateRegistration {
        token: String,
        existing: &'static str,
        requested: &'static str,
    },

    /// Resolution path revisited a token; the full cycle is reported.
    #[error("circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// A deferred token unwrap looped on itself.
    #[error("deferred token reference loops on itself after {depth} unwrap steps")]
    CircularReference { depth: usize },

    /// A singleton consumer depends, directly or transitively, on a scoped
    /// registration.
    #[error("singleton `{consumer}` cannot depend on scoped `{dependency}`: the singleton would outlive the session")]
    LifecycleViolation {
        consumer: String,
        dependency: String,
    },

    /// Scoped resolution attempted with no session in context and none
    /// supplied.
    #[error("scoped token `{0}` resolved with no active session")]
    NoActiveSession(String),

    /// An explicitly supplied session id does not exist.
    #[error("session {0} does not exist")]
    SessionNotFound(SessionId),

    /// The expected scope name conflicts with the session's actual tag.
    #[error("session {session} belongs to scope `{actual}`, expected `{expected}`")]
    ScopeMismatch {
        session: SessionId,
        expected: String,
        actual: String,
    },

    /// A constructor or property parameter could not be supplied as declared.
    #[error("unresolvable parameter {parameter} of `{target}`: {reason}")]
    UnresolvableParameter {
        target: &'static str,
        parameter: String,
        reason: String,
    },

    /// A resolved instance failed to downcast to the requested type.
    #[error("type mismatch for `{0}`")]
    TypeMismatch(&'static str),
}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;
