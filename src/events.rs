//! Event bus and aggregate statistics.
//!
//! Every resolution, instantiation and disposal emits a structured
//! notification. Emission cascades from child containers to their ancestors,
//! so a listener on a root container observes everything that happens in any
//! descendant.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::lifetime::Lifetime;
use crate::session::SessionId;

/// The six notification channels of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResolveStart,
    ResolveSuccess,
    ResolveError,
    Instantiate,
    Dispose,
    StatsChange,
}

impl EventKind {
    /// Wire-style event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ResolveStart => "resolve:start",
            EventKind::ResolveSuccess => "resolve:success",
            EventKind::ResolveError => "resolve:error",
            EventKind::Instantiate => "instantiate",
            EventKind::Dispose => "dispose",
            EventKind::StatsChange => "stats:change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured notification payload.
#[derive(Debug, Clone)]
pub enum DiEvent {
    ResolveStart {
        token: String,
        session: Option<SessionId>,
    },
    ResolveSuccess {
        token: String,
        lifecycle: Lifetime,
        session: Option<SessionId>,
    },
    ResolveError {
        token: String,
        error: String,
    },
    Instantiate {
        token: String,
        lifecycle: Lifetime,
    },
    /// A disposal hook settled. `error` carries the swallowed failure, if
    /// any; teardown itself always completes.
    Dispose {
        token: String,
        error: Option<String>,
    },
    StatsChange {
        stats: DiStats,
    },
}

impl DiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DiEvent::ResolveStart { .. } => EventKind::ResolveStart,
            DiEvent::ResolveSuccess { .. } => EventKind::ResolveSuccess,
            DiEvent::ResolveError { .. } => EventKind::ResolveError,
            DiEvent::Instantiate { .. } => EventKind::Instantiate,
            DiEvent::Dispose { .. } => EventKind::Dispose,
            DiEvent::StatsChange { .. } => EventKind::StatsChange,
        }
    }
}

/// Aggregate counters snapshot carried by `stats:change` events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiStats {
    pub registrations: u64,
    pub active_sessions: u64,
    pub resolutions: u64,
    pub resolution_failures: u64,
    pub instantiations: u64,
    pub disposals: u64,
}

/// Live counters backing [`DiStats`] snapshots.
#[derive(Default)]
pub(crate) struct StatsCounters {
    registrations: AtomicU64,
    active_sessions: AtomicU64,
    resolutions: AtomicU64,
    resolution_failures: AtomicU64,
    instantiations: AtomicU64,
    disposals: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> DiStats {
        DiStats {
            registrations: self.registrations.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            instantiations: self.instantiations.load(Ordering::Relaxed),
            disposals: self.disposals.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_registrations(&self) {
        self.registrations.store(0, Ordering::Relaxed);
    }

    pub(crate) fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self) {
        // Saturating: destroy of an already-drained session set must not wrap.
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn record_resolution(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_instantiation(&self) {
        self.instantiations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disposal(&self) {
        self.disposals.fetch_add(1, Ordering::Relaxed);
    }
}

type ListenerFn = Arc<dyn Fn(&DiEvent) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    kind: EventKind,
    callback: ListenerFn,
}

/// Per-container publish/subscribe hub.
pub(crate) struct EventBus {
    listeners: Mutex<Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn add_listener(&self, kind: EventKind, callback: ListenerFn) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(ListenerEntry { id, kind, callback });
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    pub(crate) fn has_listeners(&self, kind: EventKind) -> bool {
        self.listeners.lock().iter().any(|entry| entry.kind == kind)
    }

    /// Invokes every matching listener against a stable snapshot, so a
    /// listener unsubscribing itself mid-emission cannot corrupt the
    /// iteration. A panicking listener is isolated; the rest still run.
    pub(crate) fn emit(&self, event: &DiEvent) {
        let kind = event.kind();
        let snapshot: Vec<ListenerFn> = {
            let listeners = self.listeners.lock();
            listeners
                .iter()
                .filter(|entry| entry.kind == kind)
                .map(|entry| entry.callback.clone())
                .collect()
        };
        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(event = %kind, "event listener panicked; isolating and continuing");
            }
        }
    }
}

/// Handle returned by [`Container::on`](crate::Container::on).
///
/// The listener stays registered until [`unsubscribe`](Subscription::unsubscribe)
/// is called; dropping the handle does not detach it.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(bus: Weak<EventBus>, id: u64) -> Self {
        Self { bus, id }
    }

    /// Detaches the listener. Returns `false` when it was already removed or
    /// the container is gone.
    pub fn unsubscribe(&self) -> bool {
        self.bus.upgrade().map_or(false, |bus| bus.remove(self.id))
    }
}
