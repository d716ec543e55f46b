//! Registrations and the per-container registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::blueprint::{AnyArc, Blueprint};
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

/// Application-level tag attached to a registration.
///
/// Categories exist purely for listing and filtering; resolution behavior
/// never depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Service,
    Controller,
    Action,
    Repository,
    Entity,
    Middleware,
    Custom(&'static str),
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Service => "service",
            Category::Controller => "controller",
            Category::Action => "action",
            Category::Repository => "repository",
            Category::Entity => "entity",
            Category::Middleware => "middleware",
            Category::Custom(tag) => tag,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Service
    }
}

/// Options accepted by [`Container::register`](crate::Container::register).
///
/// Defaults: token name is the target's intrinsic type name, category is
/// [`Category::Service`], lifetime is [`Lifetime::Singleton`].
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub name: Option<String>,
    pub category: Category,
    pub lifetime: Lifetime,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the token name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }
}

/// Immutable binding from a token to a constructible target.
///
/// Created once per (token, target) pair. The singleton slot is the only
/// mutable part: it is filled lazily by the first successful singleton
/// resolution, never changes afterwards, and is dropped only when the owning
/// registry is cleared.
pub struct Registration {
    name: Arc<str>,
    category: Category,
    lifecycle: Lifetime,
    target: Arc<Blueprint>,
    singleton: OnceCell<AnyArc>,
}

impl Registration {
    pub fn token_name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn lifecycle(&self) -> Lifetime {
        self.lifecycle
    }

    pub fn target_type_name(&self) -> &'static str {
        self.target.type_name
    }

    /// Whether the singleton slot has been filled.
    pub fn has_cached_instance(&self) -> bool {
        self.singleton.get().is_some()
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    pub(crate) fn target(&self) -> &Arc<Blueprint> {
        &self.target
    }

    pub(crate) fn target_type_id(&self) -> TypeId {
        self.target.type_id
    }

    pub(crate) fn singleton_slot(&self) -> &OnceCell<AnyArc> {
        &self.singleton
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("token", &self.name)
            .field("category", &self.category)
            .field("lifecycle", &self.lifecycle)
            .field("target", &self.target.type_name)
            .field("cached", &self.has_cached_instance())
            .finish()
    }
}

/// All registrations owned by one container.
///
/// Keeps a string-keyed map, a parallel type-identity map (so resolution
/// works whether the caller supplies the alias or the type itself), and the
/// insertion order for deterministic listings.
pub(crate) struct Registry {
    by_name: HashMap<Arc<str>, Arc<Registration>>,
    by_type: HashMap<TypeId, Arc<Registration>>,
    order: Vec<Arc<Registration>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_type: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Inserts a registration, enforcing the one-target-per-token rule.
    ///
    /// Re-registering the identical (token, target) pair is a no-op that
    /// returns the existing registration; the same token with a different
    /// target fails with [`DiError::DuplicateRegistration`].
    pub(crate) fn register(
        &mut self,
        blueprint: Blueprint,
        options: RegisterOptions,
    ) -> DiResult<Arc<Registration>> {
        let name: Arc<str> = match options.name {
            Some(name) => Arc::from(name.as_str()),
            None => Arc::from(blueprint.type_name),
        };

        if let Some(existing) = self.by_name.get(&name) {
            if existing.target_type_id() == blueprint.type_id {
                trace!(token = %name, "identical registration repeated, returning existing");
                return Ok(existing.clone());
            }
            return Err(DiError::DuplicateRegistration {
                token: name.to_string(),
                existing: existing.target_type_name(),
                requested: blueprint.type_name,
            });
        }

        let registration = Arc::new(Registration {
            name: name.clone(),
            category: options.category,
            lifecycle: options.lifetime,
            target: Arc::new(blueprint),
            singleton: OnceCell::new(),
        });

        debug!(
            token = %name,
            category = %registration.category,
            lifecycle = %registration.lifecycle,
            "registered target"
        );

        self.by_name.insert(name, registration.clone());
        // First registration wins the type-identity slot; later aliases of
        // the same type stay reachable by name.
        self.by_type
            .entry(registration.target_type_id())
            .or_insert_with(|| registration.clone());
        self.order.push(registration.clone());
        Ok(registration)
    }

    /// Looks up a registration by canonical (non-deferred) token.
    pub(crate) fn find(&self, token: &crate::token::Token) -> Option<Arc<Registration>> {
        match token {
            crate::token::Token::Name(name) => self.by_name.get(name.as_ref()).cloned(),
            crate::token::Token::Type(type_id, _) => self.by_type.get(type_id).cloned(),
            crate::token::Token::Deferred(_) => None,
        }
    }

    pub(crate) fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Local registrations in insertion order, optionally filtered by
    /// category.
    pub(crate) fn list(&self, category: Option<Category>) -> Vec<Arc<Registration>> {
        self.order
            .iter()
            .filter(|reg| category.map_or(true, |c| reg.category() == c))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Resets the registry to empty. Live instance disposal is orchestrated
    /// by the container before this is called.
    pub(crate) fn clear(&mut self) {
        self.by_name.clear();
        self.by_type.clear();
        self.order.clear();
    }
}
