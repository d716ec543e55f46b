//! Labeled disposal hooks collected per session or per container.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future type for disposal operations.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Synchronous disposal hook.
pub(crate) type SyncHook = Box<dyn FnOnce() + Send>;

/// Asynchronous disposal hook factory.
pub(crate) type AsyncHook = Box<dyn FnOnce() -> BoxFutureUnit + Send>;

/// Container for disposal hooks, each labeled with the token it belongs to.
///
/// The bag only collects; draining and execution policy (concurrent start,
/// await-all, swallow-and-report) live with the container, which owns the
/// event bus the outcomes are reported on.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<(Arc<str>, SyncHook)>,
    asyncs: Vec<(Arc<str>, AsyncHook)>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, label: Arc<str>, hook: SyncHook) {
        self.sync.push((label, hook));
    }

    pub(crate) fn push_async(&mut self, label: Arc<str>, hook: AsyncHook) {
        self.asyncs.push((label, hook));
    }

    /// Consumes the bag, yielding sync and async hooks in registration order.
    pub(crate) fn into_parts(self) -> (Vec<(Arc<str>, SyncHook)>, Vec<(Arc<str>, AsyncHook)>) {
        (self.sync, self.asyncs)
    }
}
