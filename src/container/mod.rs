//! The container facade: registry, hierarchy, sessions and teardown.

mod lifecycle;
mod resolver;

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::blueprint::{AnyArc, Blueprint};
use crate::error::{DiError, DiResult};
use crate::events::{DiEvent, DiStats, EventBus, EventKind, StatsCounters, Subscription};
use crate::internal::{panic_message, DisposeBag};
use crate::registration::{Category, RegisterOptions, Registration, Registry};
use crate::session::{Session, SessionId, SessionInfo, SessionOptions, CURRENT_SESSION};
use crate::token::Token;

/// Per-resolution options: an explicit session and/or a scope-name
/// expectation cross-checked against the session's tag.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub session: Option<SessionId>,
    pub scope: Option<String>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_session(mut self, id: SessionId) -> Self {
        self.session = Some(id);
        self
    }

    pub fn expect_scope(mut self, name: impl Into<String>) -> Self {
        self.scope = Some(name.into());
        self
    }
}

/// Inheritance filters for [`Container::create_child`].
///
/// Filter entries are token descriptors; each is normalized through the same
/// deferred-unwrap and description logic used for diagnostics, so a filter
/// may name either a string alias or a type.
#[derive(Default)]
pub struct ChildOptions {
    pub include: Vec<Token>,
    pub exclude: Vec<Token>,
}

impl ChildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, token: impl Into<Token>) -> Self {
        self.include.push(token.into());
        self
    }

    pub fn exclude(mut self, token: impl Into<Token>) -> Self {
        self.exclude.push(token.into());
        self
    }
}

/// Normalized include/exclude sets gating parent fallback.
pub(crate) struct InheritanceFilters {
    include: Option<HashSet<String>>,
    exclude: HashSet<String>,
}

impl InheritanceFilters {
    fn unrestricted() -> Self {
        Self {
            include: None,
            exclude: HashSet::new(),
        }
    }

    fn normalize(options: &ChildOptions) -> DiResult<Self> {
        let mut exclude = HashSet::new();
        for token in &options.exclude {
            exclude.insert(token.canonical()?.description());
        }
        let include = if options.include.is_empty() {
            None
        } else {
            let mut set = HashSet::new();
            for token in &options.include {
                set.insert(token.canonical()?.description());
            }
            Some(set)
        };
        Ok(Self { include, exclude })
    }

    /// Exclude check first, then the include check when include entries
    /// exist. Filters gate registration fallback only, never observability.
    pub(crate) fn allows(&self, description: &str) -> bool {
        if self.exclude.contains(description) {
            return false;
        }
        self.include
            .as_ref()
            .map_or(true, |set| set.contains(description))
    }
}

pub(crate) struct ContainerShared {
    pub(crate) registry: RwLock<Registry>,
    /// Non-owning: a child never keeps its parent alive.
    pub(crate) parent: Option<Weak<ContainerShared>>,
    pub(crate) filters: InheritanceFilters,
    pub(crate) sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) stats: StatsCounters,
    pub(crate) root_disposers: Mutex<DisposeBag>,
    pub(crate) modules: Mutex<HashSet<String>>,
}

impl ContainerShared {
    fn fresh(parent: Option<Weak<ContainerShared>>, filters: InheritanceFilters) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            parent,
            filters,
            sessions: Mutex::new(HashMap::new()),
            events: Arc::new(EventBus::new()),
            stats: StatsCounters::default(),
            root_disposers: Mutex::new(DisposeBag::default()),
            modules: Mutex::new(HashSet::new()),
        }
    }

    /// Emits on this container's bus and every reachable ancestor's.
    pub(crate) fn emit_event(&self, event: &DiEvent) {
        self.events.emit(event);
        let mut ancestor = self.parent.as_ref().and_then(Weak::upgrade);
        while let Some(shared) = ancestor {
            shared.events.emit(event);
            ancestor = shared.parent.as_ref().and_then(Weak::upgrade);
        }
    }

    /// Fast path: whether anyone along the chain listens for `kind`.
    pub(crate) fn observed(&self, kind: EventKind) -> bool {
        if self.events.has_listeners(kind) {
            return true;
        }
        let mut ancestor = self.parent.as_ref().and_then(Weak::upgrade);
        while let Some(shared) = ancestor {
            if shared.events.has_listeners(kind) {
                return true;
            }
            ancestor = shared.parent.as_ref().and_then(Weak::upgrade);
        }
        false
    }
}

/// Dependency injection container.
///
/// Cheap to clone (`Arc` handle). Registration happens during an application
/// bootstrap phase; resolution, sessions and teardown are available for the
/// container's whole life.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use wirebox::{Blueprint, Container, Lifetime, RegisterOptions, Token};
///
/// struct Repo;
/// struct Service {
///     repo: Arc<Repo>,
/// }
///
/// let container = Container::new();
/// container
///     .register(Blueprint::from_factory(|| Repo), RegisterOptions::new().named("repo"))
///     .unwrap();
/// container
///     .register(
///         Blueprint::of::<Service>()
///             .with_dependency(Token::name("repo"))
///             .constructed_by(|args| Ok(Service { repo: args.take::<Repo>()? })),
///         RegisterOptions::new().lifetime(Lifetime::Transient),
///     )
///     .unwrap();
///
/// let first = container.resolve::<Service>().unwrap();
/// let second = container.resolve::<Service>().unwrap();
/// assert!(!Arc::ptr_eq(&first, &second)); // transient service
/// assert!(Arc::ptr_eq(&first.repo, &second.repo)); // shared singleton repo
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) shared: Arc<ContainerShared>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty root container.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ContainerShared::fresh(None, InheritanceFilters::unrestricted())),
        }
    }

    // ----- Registration -----

    /// Registers a blueprint under its token.
    ///
    /// Fails with [`DiError::DuplicateRegistration`] when the token is
    /// already bound to a different target; repeating the identical
    /// (token, target) pair returns the existing registration unchanged.
    pub fn register(
        &self,
        blueprint: Blueprint,
        options: RegisterOptions,
    ) -> DiResult<Arc<Registration>> {
        let (registration, added) = {
            let mut registry = self.shared.registry.write();
            let before = registry.len();
            let registration = registry.register(blueprint, options)?;
            let added = registry.len() > before;
            (registration, added)
        };
        if added {
            self.shared.stats.record_registration();
            self.emit_stats_change();
        }
        Ok(registration)
    }

    /// Visible registrations, optionally filtered by category.
    ///
    /// Merges the parent's visible, filter-passing registrations with the
    /// local ones; a local registration always shadows an inherited one with
    /// the same token.
    pub fn list(&self, category: Option<Category>) -> Vec<Arc<Registration>> {
        let mut merged = Vec::new();
        if let Some(parent) = self.parent() {
            for registration in parent.list(category) {
                let visible = self.shared.filters.allows(registration.token_name());
                let shadowed = self
                    .shared
                    .registry
                    .read()
                    .contains_name(registration.token_name());
                if visible && !shadowed {
                    merged.push(registration);
                }
            }
        }
        merged.extend(self.shared.registry.read().list(category));
        merged
    }

    /// Looks up the local registration for a token, trying the string alias
    /// and then the type identity after fully unwrapping deferred references.
    ///
    /// Local only; hierarchy composition happens in [`resolve`](Container::resolve)
    /// and [`list`](Container::list).
    pub fn find_registration(
        &self,
        token: impl Into<Token>,
    ) -> DiResult<Option<Arc<Registration>>> {
        let canonical = token.into().canonical()?;
        Ok(self.shared.registry.read().find(&canonical))
    }

    // ----- Resolution -----

    /// Resolves a target by its type identity.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.resolve_with::<T, _>(Token::of::<T>(), &ResolveOptions::default())
    }

    /// Resolves a target by its string alias.
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.resolve_with::<T, _>(Token::name(name), &ResolveOptions::default())
    }

    /// Resolves a token with explicit options and downcasts the result.
    pub fn resolve_with<T, K>(&self, token: K, options: &ResolveOptions) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        K: Into<Token>,
    {
        let value = self.resolve_token(token, options)?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Type-erased resolution, the engine underneath every typed variant.
    pub fn resolve_token(
        &self,
        token: impl Into<Token>,
        options: &ResolveOptions,
    ) -> DiResult<AnyArc> {
        resolver::resolve_entry(self, token.into(), options)
    }

    // ----- Hierarchy -----

    /// Creates a child container that falls back to this one for tokens it
    /// does not register locally, subject to the given filters.
    ///
    /// The child holds only a non-owning reference; once the parent is
    /// dropped, fallback quietly stops and unresolved tokens report
    /// [`DiError::NotFound`].
    pub fn create_child(&self, options: ChildOptions) -> DiResult<Container> {
        let filters = InheritanceFilters::normalize(&options)?;
        debug!("creating child container");
        Ok(Container {
            shared: Arc::new(ContainerShared::fresh(
                Some(Arc::downgrade(&self.shared)),
                filters,
            )),
        })
    }

    pub(crate) fn parent(&self) -> Option<Container> {
        self.shared
            .parent
            .as_ref()?
            .upgrade()
            .map(|shared| Container { shared })
    }

    // ----- Sessions -----

    /// Opens a new session with an optional scope tag.
    pub fn create_session(&self, scope_name: Option<&str>) -> SessionInfo {
        let session = Session::new(scope_name);
        let info = session.info();
        debug!(session = %info.id, scope = scope_name.unwrap_or("-"), "session created");
        self.shared.sessions.lock().insert(info.id, session);
        self.shared.stats.session_opened();
        self.emit_stats_change();
        info
    }

    pub(crate) fn find_session(&self, id: SessionId) -> Option<Arc<Session>> {
        if let Some(session) = self.shared.sessions.lock().get(&id).cloned() {
            return Some(session);
        }
        self.parent()?.find_session(id)
    }

    /// Destroys a session, invoking every disposal hook its cache collected.
    ///
    /// All async hooks are started concurrently and this call does not return
    /// until every one of them has settled. Hook failures are swallowed so
    /// teardown always completes, but each outcome is still reported through
    /// the `dispose` event.
    pub async fn destroy_session(&self, id: SessionId) -> DiResult<()> {
        let session = self
            .shared
            .sessions
            .lock()
            .remove(&id)
            .ok_or(DiError::SessionNotFound(id))?;
        debug!(session = %id, "destroying session");
        let bag = session.take_disposers();
        self.run_disposal(bag).await;
        self.shared.stats.session_closed();
        self.emit_stats_change();
        Ok(())
    }

    /// Synchronous session teardown for purely synchronous graphs.
    ///
    /// Sync hooks run inline. Async hooks cannot be awaited here: inside a
    /// tokio runtime they are spawned detached, otherwise they are dropped
    /// and the loss is reported through the `dispose` event.
    pub fn destroy_session_sync(&self, id: SessionId) -> DiResult<()> {
        let session = self
            .shared
            .sessions
            .lock()
            .remove(&id)
            .ok_or(DiError::SessionNotFound(id))?;
        debug!(session = %id, "destroying session (sync)");
        let (sync_hooks, async_hooks) = session.take_disposers().into_parts();
        for (label, hook) in sync_hooks {
            let error = catch_unwind(AssertUnwindSafe(hook)).err().map(panic_message);
            self.report_disposal(&label, error);
        }
        if !async_hooks.is_empty() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    for (label, hook) in async_hooks {
                        handle.spawn(hook());
                        self.report_disposal(&label, None);
                    }
                }
                Err(_) => {
                    for (label, _hook) in async_hooks {
                        self.report_disposal(
                            &label,
                            Some("async disposal hook dropped outside an async runtime".to_string()),
                        );
                    }
                }
            }
        }
        self.shared.stats.session_closed();
        self.emit_stats_change();
        Ok(())
    }

    /// Runs `callback` with an ambient session.
    ///
    /// With [`SessionOptions::existing`] the named session is reused — failing
    /// [`DiError::SessionNotFound`] when unknown and
    /// [`DiError::ScopeMismatch`] when a conflicting scope name was also
    /// given — and left alive afterwards. Otherwise a fresh session is
    /// created and destroyed once the callback's future settles, whether the
    /// callback's own result was a success or a failure.
    ///
    /// Scoped resolutions anywhere inside the callback's asynchronous extent
    /// see the session without it being passed explicitly; concurrently
    /// running invocations are isolated from each other.
    pub async fn run_in_session<F, Fut, R>(
        &self,
        options: SessionOptions,
        callback: F,
    ) -> DiResult<R>
    where
        F: FnOnce(SessionInfo) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let (info, fresh) = self.enter_session(&options)?;
        let id = info.id;
        let result = CURRENT_SESSION.scope(id, callback(info)).await;
        if fresh {
            // Tolerate a callback that already destroyed its own session.
            let _ = self.destroy_session(id).await;
        }
        Ok(result)
    }

    /// Synchronous twin of [`run_in_session`](Container::run_in_session).
    ///
    /// A freshly-created session is destroyed on every exit path, including
    /// a panicking callback; the panic then resumes.
    pub fn run_in_session_sync<F, R>(&self, options: SessionOptions, callback: F) -> DiResult<R>
    where
        F: FnOnce(SessionInfo) -> R,
    {
        let (info, fresh) = self.enter_session(&options)?;
        let id = info.id;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            CURRENT_SESSION.sync_scope(id, || callback(info))
        }));
        if fresh {
            let _ = self.destroy_session_sync(id);
        }
        match outcome {
            Ok(value) => Ok(value),
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Sugar for [`run_in_session`](Container::run_in_session) with the scope
    /// name always supplied.
    pub async fn run_in_scope<F, Fut, R>(&self, scope_name: &str, callback: F) -> DiResult<R>
    where
        F: FnOnce(SessionInfo) -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        self.run_in_session(SessionOptions::new().scope(scope_name), callback)
            .await
    }

    /// Sugar for [`run_in_session_sync`](Container::run_in_session_sync) with
    /// the scope name always supplied.
    pub fn run_in_scope_sync<F, R>(&self, scope_name: &str, callback: F) -> DiResult<R>
    where
        F: FnOnce(SessionInfo) -> R,
    {
        self.run_in_session_sync(SessionOptions::new().scope(scope_name), callback)
    }

    fn enter_session(&self, options: &SessionOptions) -> DiResult<(SessionInfo, bool)> {
        match options.session {
            Some(id) => {
                let session = self.find_session(id).ok_or(DiError::SessionNotFound(id))?;
                if let Some(expected) = &options.scope_name {
                    let actual = session.scope_name().unwrap_or("");
                    if actual != expected {
                        return Err(DiError::ScopeMismatch {
                            session: id,
                            expected: expected.clone(),
                            actual: actual.to_string(),
                        });
                    }
                }
                Ok((session.info(), false))
            }
            None => Ok((self.create_session(options.scope_name.as_deref()), true)),
        }
    }

    // ----- Teardown -----

    /// Full container teardown: destroys every live session, disposes every
    /// singleton instance ever created (same concurrent-await-and-swallow
    /// policy as session teardown), then wipes the registry and the
    /// installed-module set.
    pub async fn clear(&self) {
        debug!("clearing container");
        let sessions: Vec<Arc<Session>> = {
            self.shared
                .sessions
                .lock()
                .drain()
                .map(|(_, session)| session)
                .collect()
        };
        for session in sessions {
            let bag = session.take_disposers();
            self.run_disposal(bag).await;
            self.shared.stats.session_closed();
        }
        let root_bag = std::mem::take(&mut *self.shared.root_disposers.lock());
        self.run_disposal(root_bag).await;
        self.shared.registry.write().clear();
        self.shared.modules.lock().clear();
        self.shared.stats.reset_registrations();
        self.emit_stats_change();
    }

    pub(crate) async fn run_disposal(&self, bag: DisposeBag) {
        let (sync_hooks, async_hooks) = bag.into_parts();
        let mut pending = Vec::with_capacity(async_hooks.len());
        for (label, hook) in async_hooks {
            pending.push((label, tokio::spawn(hook())));
        }
        for (label, hook) in sync_hooks {
            let error = catch_unwind(AssertUnwindSafe(hook)).err().map(panic_message);
            self.report_disposal(&label, error);
        }
        for (label, handle) in pending {
            let error = match handle.await {
                Ok(()) => None,
                Err(join_error) => Some(if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "disposal task was cancelled".to_string()
                }),
            };
            self.report_disposal(&label, error);
        }
    }

    pub(crate) fn report_disposal(&self, label: &str, error: Option<String>) {
        if let Some(failure) = &error {
            warn!(token = label, error = %failure, "disposal hook failed; teardown continues");
        }
        self.shared.stats.record_disposal();
        if self.shared.observed(EventKind::Dispose) {
            self.shared.emit_event(&DiEvent::Dispose {
                token: label.to_string(),
                error,
            });
        }
        self.emit_stats_change();
    }

    // ----- Observation -----

    /// Subscribes a listener to one event kind. The returned handle detaches
    /// the listener via [`Subscription::unsubscribe`].
    pub fn on<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&DiEvent) + Send + Sync + 'static,
    {
        let id = self.shared.events.add_listener(kind, Arc::new(listener));
        Subscription::new(Arc::downgrade(&self.shared.events), id)
    }

    /// Current aggregate counters.
    pub fn stats(&self) -> DiStats {
        self.shared.stats.snapshot()
    }

    pub(crate) fn emit_stats_change(&self) {
        if self.shared.observed(EventKind::StatsChange) {
            self.shared.emit_event(&DiEvent::StatsChange {
                stats: self.shared.stats.snapshot(),
            });
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.shared.registry.read().len())
            .field("sessions", &self.shared.sessions.lock().len())
            .field("has_parent", &self.shared.parent.is_some())
            .finish()
    }
}
