//! Lifetime policies: caching, instantiation and disposal hook collection.

use parking_lot::Mutex;
use tracing::trace;

use crate::blueprint::{AnyArc, Injected, LazySeed, ResolvedArgs};
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::events::{DiEvent, EventKind};
use crate::internal::DisposeBag;
use crate::lifetime::Lifetime;
use crate::registration::Registration;
use crate::token::Token;

use super::resolver::{self, ResolveCtx};

/// Hands back a cached instance for the registration's lifetime scope, or
/// instantiates a fresh one and caches it appropriately.
pub(crate) fn acquire(
    container: &Container,
    registration: &std::sync::Arc<Registration>,
    ctx: &mut ResolveCtx,
) -> DiResult<AnyArc> {
    match registration.lifecycle() {
        Lifetime::Singleton => {
            let slot = registration.singleton_slot();
            if let Some(value) = slot.get() {
                return Ok(value.clone());
            }
            // get_or_try_init leaves the slot empty on failure, so a later
            // resolution attempt retries instead of caching the error.
            let value = slot.get_or_try_init(|| {
                let value = instantiate(container, registration, ctx)?;
                push_dispose_hooks(&container.shared.root_disposers, registration, &value);
                Ok(value)
            })?;
            Ok(value.clone())
        }
        Lifetime::Scoped => {
            let session = match ctx.session.clone() {
                Some(session) => session,
                None => {
                    return Err(DiError::NoActiveSession(
                        registration.token_name().to_string(),
                    ))
                }
            };
            if let Some(expected) = ctx.scope_expectation.clone() {
                let actual = session.scope_name().unwrap_or("").to_string();
                if actual != expected {
                    return Err(DiError::ScopeMismatch {
                        session: session.id(),
                        expected,
                        actual,
                    });
                }
            }
            if let Some(cached) = session.cached(registration.token_name()) {
                return Ok(cached);
            }
            let value = instantiate(container, registration, ctx)?;
            let (stored, inserted) = session.store(registration.name_arc(), value);
            if inserted {
                push_dispose_hooks(session.disposers(), registration, &stored);
            }
            Ok(stored)
        }
        Lifetime::Transient => instantiate(container, registration, ctx),
    }
}

/// Builds a fresh instance: constructor dependencies strictly left-to-right,
/// then construction, then property dependencies in declaration order.
fn instantiate(
    container: &Container,
    registration: &std::sync::Arc<Registration>,
    ctx: &mut ResolveCtx,
) -> DiResult<AnyArc> {
    let blueprint = registration.target().clone();
    trace!(
        token = registration.token_name(),
        target = blueprint.type_name(),
        "instantiating"
    );

    let mut arguments = Vec::with_capacity(blueprint.constructor_deps.len());
    for dep in &blueprint.constructor_deps {
        arguments.push(resolve_dependency(
            container,
            &dep.token,
            dep.optional,
            dep.lazy,
            ctx,
        )?);
    }
    let mut args = ResolvedArgs::new(blueprint.type_name(), arguments);
    let value = (blueprint.construct)(&mut args)?;

    container.shared.stats.record_instantiation();
    if container.shared.observed(EventKind::Instantiate) {
        container.shared.emit_event(&DiEvent::Instantiate {
            token: registration.token_name().to_string(),
            lifecycle: registration.lifecycle(),
        });
    }
    container.emit_stats_change();

    for prop in &blueprint.property_deps {
        let injected = resolve_dependency(container, &prop.token, prop.optional, false, ctx)?;
        (prop.setter)(&value, injected)?;
    }

    Ok(value)
}

fn resolve_dependency(
    container: &Container,
    token: &Token,
    optional: bool,
    lazy: bool,
    ctx: &mut ResolveCtx,
) -> DiResult<Injected> {
    if lazy {
        // Not resolved eagerly: the thunk captures the current session and
        // re-enters the pipeline when invoked.
        return Ok(Injected::Lazy(LazySeed {
            container: container.clone(),
            token: token.clone(),
            session: ctx.session_id(),
        }));
    }
    match resolver::resolve_recursive(container, token, ctx) {
        Ok(value) => Ok(Injected::Instance(value)),
        Err(DiError::NotFound(_)) | Err(DiError::NotAvailableInContainer(_)) if optional => {
            Ok(Injected::Absent)
        }
        Err(error) => Err(error),
    }
}

/// Collects the blueprint's disposal adapters for the freshly-cached
/// instance. Only cached instances (singleton or scoped) are tracked;
/// transients are the caller's responsibility.
fn push_dispose_hooks(bag: &Mutex<DisposeBag>, registration: &Registration, value: &AnyArc) {
    let blueprint = registration.target();
    if let Some(adapter) = &blueprint.sync_dispose {
        if let Some(hook) = adapter(value) {
            bag.lock().push_sync(registration.name_arc(), hook);
        }
    }
    if let Some(adapter) = &blueprint.async_dispose {
        if let Some(hook) = adapter(value) {
            bag.lock().push_async(registration.name_arc(), hook);
        }
    }
}
