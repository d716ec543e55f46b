//! The recursive resolution engine.
//!
//! Resolution is depth-first over the declared dependency graph. The engine
//! owns the whole recursion, so the resolution path is threaded explicitly as
//! a frame stack: revisiting a token on the current stack is a circular
//! dependency, and a scoped registration reached from underneath a singleton
//! frame is a lifetime-capture violation.

use std::sync::Arc;

use tracing::trace;

use crate::blueprint::AnyArc;
use crate::container::{Container, ResolveOptions};
use crate::error::{DiError, DiResult};
use crate::events::{DiEvent, EventKind};
use crate::lifetime::Lifetime;
use crate::session::{ambient_session, Session, SessionId};
use crate::token::Token;

use super::lifecycle;

pub(crate) struct Frame {
    pub(crate) token: Arc<str>,
    pub(crate) lifecycle: Lifetime,
}

/// State carried through one top-level resolve call.
pub(crate) struct ResolveCtx {
    /// Session resolved once at entry: the explicit one from the options, or
    /// whatever session is ambient on the current task.
    pub(crate) session: Option<Arc<Session>>,
    pub(crate) scope_expectation: Option<String>,
    pub(crate) path: Vec<Frame>,
}

impl ResolveCtx {
    pub(crate) fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.id())
    }
}

pub(crate) fn resolve_entry(
    container: &Container,
    token: Token,
    options: &ResolveOptions,
) -> DiResult<AnyArc> {
    let session = match options.session {
        Some(id) => Some(
            container
                .find_session(id)
                .ok_or(DiError::SessionNotFound(id))?,
        ),
        None => ambient_session().and_then(|id| container.find_session(id)),
    };
    let mut ctx = ResolveCtx {
        session,
        scope_expectation: options.scope.clone(),
        path: Vec::new(),
    };
    resolve_recursive(container, &token, &mut ctx)
}

/// One resolution step: unwrap, look up, acquire, with events around it.
pub(crate) fn resolve_recursive(
    container: &Container,
    token: &Token,
    ctx: &mut ResolveCtx,
) -> DiResult<AnyArc> {
    let canonical = token.canonical()?;
    let description = canonical.description();
    trace!(token = %description, "resolving");

    let shared = &container.shared;
    if shared.observed(EventKind::ResolveStart) {
        shared.emit_event(&DiEvent::ResolveStart {
            token: description.clone(),
            session: ctx.session_id(),
        });
    }

    match lookup_and_acquire(container, &canonical, &description, ctx) {
        Ok((value, lifecycle)) => {
            shared.stats.record_resolution();
            if shared.observed(EventKind::ResolveSuccess) {
                shared.emit_event(&DiEvent::ResolveSuccess {
                    token: description,
                    lifecycle,
                    session: ctx.session_id(),
                });
            }
            container.emit_stats_change();
            Ok(value)
        }
        Err(error) => {
            shared.stats.record_failure();
            if shared.observed(EventKind::ResolveError) {
                shared.emit_event(&DiEvent::ResolveError {
                    token: description,
                    error: error.to_string(),
                });
            }
            container.emit_stats_change();
            Err(error)
        }
    }
}

fn lookup_and_acquire(
    container: &Container,
    token: &Token,
    description: &str,
    ctx: &mut ResolveCtx,
) -> DiResult<(AnyArc, Lifetime)> {
    let registration = container.shared.registry.read().find(token);
    let registration = match registration {
        Some(registration) => registration,
        None => return delegate_to_parent(container, token, description, ctx),
    };

    // A token already on the current stack means the declared graph loops.
    if ctx
        .path
        .iter()
        .any(|frame| frame.token.as_ref() == registration.token_name())
    {
        let mut path: Vec<String> = ctx.path.iter().map(|frame| frame.token.to_string()).collect();
        path.push(registration.token_name().to_string());
        return Err(DiError::CircularDependency { path });
    }

    // A singleton outlives every session, so it must never capture a scoped
    // instance, not even through intermediate transients.
    if registration.lifecycle() == Lifetime::Scoped {
        if let Some(consumer) = ctx
            .path
            .iter()
            .rev()
            .find(|frame| frame.lifecycle == Lifetime::Singleton)
        {
            return Err(DiError::LifecycleViolation {
                consumer: consumer.token.to_string(),
                dependency: registration.token_name().to_string(),
            });
        }
    }

    ctx.path.push(Frame {
        token: registration.name_arc(),
        lifecycle: registration.lifecycle(),
    });
    let result = lifecycle::acquire(container, &registration, ctx);
    ctx.path.pop();
    result.map(|value| (value, registration.lifecycle()))
}

/// Parent fallback: only for tokens with no local registration, and only when
/// the inheritance filters let the token through. Fenced tokens fail
/// distinctly from never-registered ones.
fn delegate_to_parent(
    container: &Container,
    token: &Token,
    description: &str,
    ctx: &mut ResolveCtx,
) -> DiResult<(AnyArc, Lifetime)> {
    match container.parent() {
        Some(parent) => {
            if container.shared.filters.allows(description) {
                trace!(token = %description, "delegating to parent container");
                lookup_and_acquire(&parent, token, description, ctx)
            } else {
                Err(DiError::NotAvailableInContainer(description.to_string()))
            }
        }
        None => Err(DiError::NotFound(description.to_string())),
    }
}
