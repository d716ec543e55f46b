//! Disposal traits for structured instance teardown.

/// Trait for synchronous resource teardown.
///
/// Implement this for targets that need cleanup when their owning session
/// ends or the container is cleared. A blueprint opts in with
/// [`disposable`](crate::BlueprintBuilder::disposable); the lifecycle manager
/// then invokes `dispose` on every cached instance during teardown.
///
/// # Examples
///
/// ```rust
/// use wirebox::Dispose;
///
/// struct Connection {
///     url: String,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         println!("closing {}", self.url);
///     }
/// }
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Performs synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource teardown.
///
/// Async hooks registered for a session are all started concurrently when the
/// session is destroyed, and the destroying call does not complete until
/// every pending hook has settled. Hook panics are swallowed so teardown
/// always finishes, but each outcome is still reported through the `dispose`
/// event.
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Performs asynchronous cleanup of resources.
    async fn dispose(&self);
}
