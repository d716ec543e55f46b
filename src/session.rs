//! Sessions: scoped units of work with their own instance caches.
//!
//! A session is the boundary a `Scoped` registration caches against. The
//! current session propagates ambiently through nested asynchronous calls via
//! a task-local, so scoped resolutions inside a callback share a session
//! without threading an argument — and two concurrently running
//! [`run_in_session`](crate::Container::run_in_session) invocations never
//! observe each other's session.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::blueprint::AnyArc;
use crate::internal::DisposeBag;

/// Monotonically-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// Process-wide counter keeps ids unique across every container.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    pub(crate) static CURRENT_SESSION: SessionId;
}

/// The session id ambient on the current task, if any.
pub(crate) fn ambient_session() -> Option<SessionId> {
    CURRENT_SESSION.try_with(|id| *id).ok()
}

/// Public descriptor of a live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: SystemTime,
    pub scope_name: Option<String>,
}

/// Options for [`Container::run_in_session`](crate::Container::run_in_session).
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Reuse this existing session instead of creating a fresh one. Reused
    /// sessions are not destroyed when the callback settles.
    pub session: Option<SessionId>,
    /// Scope tag for a fresh session, or the expected tag of a reused one.
    pub scope_name: Option<String>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(mut self, id: SessionId) -> Self {
        self.session = Some(id);
        self
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scope_name = Some(name.into());
        self
    }
}

/// One scoped unit of work, owning the instance cache for `Scoped`
/// registrations resolved under it.
pub(crate) struct Session {
    id: SessionId,
    created_at: SystemTime,
    scope_name: Option<Arc<str>>,
    cache: Mutex<HashMap<Arc<str>, AnyArc>>,
    disposers: Mutex<DisposeBag>,
}

impl Session {
    pub(crate) fn new(scope_name: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            created_at: SystemTime::now(),
            scope_name: scope_name.map(Arc::from),
            cache: Mutex::new(HashMap::new()),
            disposers: Mutex::new(DisposeBag::default()),
        })
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn scope_name(&self) -> Option<&str> {
        self.scope_name.as_deref()
    }

    pub(crate) fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            created_at: self.created_at,
            scope_name: self.scope_name.as_deref().map(str::to_string),
        }
    }

    pub(crate) fn cached(&self, token_name: &str) -> Option<AnyArc> {
        self.cache.lock().get(token_name).cloned()
    }

    /// Double-checked insert: the first writer wins, a racing duplicate is
    /// handed the already-stored instance.
    pub(crate) fn store(&self, token_name: Arc<str>, value: AnyArc) -> (AnyArc, bool) {
        let mut cache = self.cache.lock();
        match cache.entry(token_name) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
                (value, true)
            }
        }
    }

    pub(crate) fn disposers(&self) -> &Mutex<DisposeBag> {
        &self.disposers
    }

    /// Drains the disposal hooks for teardown and empties the cache.
    pub(crate) fn take_disposers(&self) -> DisposeBag {
        self.cache.lock().clear();
        std::mem::take(&mut *self.disposers.lock())
    }
}
