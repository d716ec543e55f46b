//! Target blueprints: declared dependencies plus a constructor.
//!
//! A [`Blueprint`] is the explicit, registration-time counterpart of the
//! metadata a reflective platform would infer: the ordered constructor
//! dependency tokens, the named property dependencies, and a closure that
//! builds the instance from the resolved arguments. The resolver consumes
//! blueprints read-only and never learns how they were produced.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::{Container, ResolveOptions};
use crate::dispose::{AsyncDispose, Dispose};
use crate::error::{DiError, DiResult};
use crate::internal::{AsyncHook, BoxFutureUnit, SyncHook};
use crate::session::SessionId;
use crate::token::Token;

/// Type-erased shared instance, the currency of the resolution pipeline.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type ConstructFn = Arc<dyn Fn(&mut ResolvedArgs) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type PropertySetterFn = Arc<dyn Fn(&AnyArc, Injected) -> DiResult<()> + Send + Sync>;
pub(crate) type SyncDisposeAdapter = Arc<dyn Fn(&AnyArc) -> Option<SyncHook> + Send + Sync>;
pub(crate) type AsyncDisposeAdapter = Arc<dyn Fn(&AnyArc) -> Option<AsyncHook> + Send + Sync>;

/// One declared constructor dependency.
pub(crate) struct DepSpec {
    pub(crate) token: Token,
    pub(crate) optional: bool,
    pub(crate) lazy: bool,
}

/// One declared property dependency, applied after construction.
pub(crate) struct PropSpec {
    pub(crate) name: &'static str,
    pub(crate) token: Token,
    pub(crate) optional: bool,
    pub(crate) setter: PropertySetterFn,
}

/// Constructible target descriptor: dependency declarations plus constructor.
///
/// Built through the typed [`BlueprintBuilder`] and stored inside a
/// [`Registration`](crate::Registration). Constructor dependencies resolve
/// strictly left-to-right in declaration order; property dependencies resolve
/// after construction, also in declaration order.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use wirebox::{Blueprint, Container, RegisterOptions, Token};
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
///         RegisterOptions::new(),
///     )
///     .unwrap();
///
/// let service = container.resolve::<Service>().unwrap();
/// let repo = container.resolve_named::<Repo>("repo").unwrap();
/// assert!(Arc::ptr_eq(&service.repo, &repo));
/// ```
pub struct Blueprint {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) constructor_deps: Vec<DepSpec>,
    pub(crate) property_deps: Vec<PropSpec>,
    pub(crate) construct: ConstructFn,
    pub(crate) sync_dispose: Option<SyncDisposeAdapter>,
    pub(crate) async_dispose: Option<AsyncDisposeAdapter>,
}

impl Blueprint {
    /// Starts a typed builder for `T`.
    pub fn of<T: Send + Sync + 'static>() -> BlueprintBuilder<T> {
        BlueprintBuilder {
            constructor_deps: Vec::new(),
            property_deps: Vec::new(),
            sync_dispose: None,
            async_dispose: None,
            _marker: PhantomData,
        }
    }

    /// Blueprint for an already-constructed value.
    ///
    /// Every resolution hands back the same shared instance, which makes this
    /// the natural shape for singleton leaf registrations such as
    /// configuration values.
    pub fn from_value<T: Send + Sync + 'static>(value: T) -> Blueprint {
        let shared: AnyArc = Arc::new(value);
        Blueprint {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor_deps: Vec::new(),
            property_deps: Vec::new(),
            construct: Arc::new(move |_| Ok(shared.clone())),
            sync_dispose: None,
            async_dispose: None,
        }
    }

    /// Blueprint for a dependency-free factory.
    pub fn from_factory<T, F>(factory: F) -> Blueprint
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Blueprint::of::<T>().constructed_by(move |_| Ok(factory()))
    }

    /// Type name of the constructible target, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Typed builder collecting dependency declarations for a target `T`.
pub struct BlueprintBuilder<T> {
    constructor_deps: Vec<DepSpec>,
    property_deps: Vec<PropSpec>,
    sync_dispose: Option<SyncDisposeAdapter>,
    async_dispose: Option<AsyncDisposeAdapter>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BlueprintBuilder<T> {
    /// Declares a required positional constructor dependency.
    pub fn with_dependency(mut self, token: impl Into<Token>) -> Self {
        self.constructor_deps.push(DepSpec {
            token: token.into(),
            optional: false,
            lazy: false,
        });
        self
    }

    /// Declares an optional positional constructor dependency.
    ///
    /// When the token cannot be found anywhere reachable, the constructor
    /// receives an explicit absent value instead of the resolution failing.
    pub fn with_optional_dependency(mut self, token: impl Into<Token>) -> Self {
        self.constructor_deps.push(DepSpec {
            token: token.into(),
            optional: true,
            lazy: false,
        });
        self
    }

    /// Declares a lazily-resolved constructor dependency.
    ///
    /// The dependency is not resolved while the instance is being built; the
    /// constructor instead receives a [`Lazy`] thunk capturing the current
    /// session, and invoking it later runs the ordinary resolution pipeline.
    /// This is the supported mechanism for constructing mutually-dependent
    /// targets without infinite recursion.
    pub fn with_lazy_dependency(mut self, token: impl Into<Token>) -> Self {
        self.constructor_deps.push(DepSpec {
            token: token.into(),
            optional: false,
            lazy: true,
        });
        self
    }

    /// Declares a required named property dependency, assigned after
    /// construction through `setter`.
    ///
    /// The target needs interior mutability in the receiving field; a
    /// `OnceLock` slot is the usual shape.
    pub fn with_property<P, F>(mut self, name: &'static str, token: Token, setter: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T, Arc<P>) + Send + Sync + 'static,
    {
        self.property_deps.push(PropSpec {
            name,
            token,
            optional: false,
            setter: Arc::new(move |instance, injected| {
                let typed = downcast_receiver::<T>(instance, name)?;
                match injected {
                    Injected::Instance(value) => {
                        let value = value.downcast::<P>().map_err(|_| {
                            property_error::<T>(name, "injected value has an unexpected type")
                        })?;
                        setter(&typed, value);
                        Ok(())
                    }
                    Injected::Absent => {
                        Err(property_error::<T>(name, "required property missing"))
                    }
                    Injected::Lazy(_) => {
                        Err(property_error::<T>(name, "lazy injection is not supported for properties"))
                    }
                }
            }),
        });
        self
    }

    /// Declares an optional named property dependency.
    pub fn with_optional_property<P, F>(mut self, name: &'static str, token: Token, setter: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn(&T, Option<Arc<P>>) + Send + Sync + 'static,
    {
        self.property_deps.push(PropSpec {
            name,
            token,
            optional: true,
            setter: Arc::new(move |instance, injected| {
                let typed = downcast_receiver::<T>(instance, name)?;
                match injected {
                    Injected::Instance(value) => {
                        let value = value.downcast::<P>().map_err(|_| {
                            property_error::<T>(name, "injected value has an unexpected type")
                        })?;
                        setter(&typed, Some(value));
                        Ok(())
                    }
                    Injected::Absent => {
                        setter(&typed, None);
                        Ok(())
                    }
                    Injected::Lazy(_) => {
                        Err(property_error::<T>(name, "lazy injection is not supported for properties"))
                    }
                }
            }),
        });
        self
    }

    /// Wires the target's [`Dispose`] implementation into teardown.
    pub fn disposable(mut self) -> Self
    where
        T: Dispose,
    {
        self.sync_dispose = Some(Arc::new(|value: &AnyArc| {
            value.clone().downcast::<T>().ok().map(|typed| {
                Box::new(move || typed.dispose()) as SyncHook
            })
        }));
        self
    }

    /// Wires the target's [`AsyncDispose`] implementation into teardown.
    pub fn async_disposable(mut self) -> Self
    where
        T: AsyncDispose,
    {
        self.async_dispose = Some(Arc::new(|value: &AnyArc| {
            value.clone().downcast::<T>().ok().map(|typed| {
                Box::new(move || -> BoxFutureUnit {
                    Box::pin(async move { typed.dispose().await })
                }) as AsyncHook
            })
        }));
        self
    }

    /// Finishes the builder with the constructor closure.
    ///
    /// The closure consumes the resolved arguments strictly in declaration
    /// order through [`ResolvedArgs::take`] and its variants.
    pub fn constructed_by<F>(self, construct: F) -> Blueprint
    where
        F: Fn(&mut ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        Blueprint {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor_deps: self.constructor_deps,
            property_deps: self.property_deps,
            construct: Arc::new(move |args| Ok(Arc::new(construct(args)?) as AnyArc)),
            sync_dispose: self.sync_dispose,
            async_dispose: self.async_dispose,
        }
    }
}

fn downcast_receiver<T: Send + Sync + 'static>(
    instance: &AnyArc,
    property: &'static str,
) -> DiResult<Arc<T>> {
    instance
        .clone()
        .downcast::<T>()
        .map_err(|_| property_error::<T>(property, "property receiver has an unexpected type"))
}

fn property_error<T>(property: &'static str, reason: &str) -> DiError {
    DiError::UnresolvableParameter {
        target: std::any::type_name::<T>(),
        parameter: property.to_string(),
        reason: reason.to_string(),
    }
}

/// A resolved dependency as handed to constructors and property setters.
pub enum Injected {
    /// The resolved instance.
    Instance(AnyArc),
    /// Explicit absent value for an optional dependency that was not found.
    Absent,
    /// Deferred resolution thunk for a lazily-declared dependency.
    Lazy(LazySeed),
}

/// Untyped state captured for a lazy dependency: the container, the deferred
/// token, and the session that was ambient when the thunk was produced.
pub struct LazySeed {
    pub(crate) container: Container,
    pub(crate) token: Token,
    pub(crate) session: Option<SessionId>,
}

/// Deferred resolution handle for a lazily-declared dependency of type `T`.
///
/// Invoking [`get`](Lazy::get) re-enters the ordinary resolution pipeline
/// against the captured session context. Do not invoke it from inside the
/// constructor that received it; resolve after construction completes.
pub struct Lazy<T> {
    seed: LazySeed,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Lazy<T> {
    /// Resolves the underlying token now.
    pub fn get(&self) -> DiResult<Arc<T>> {
        let mut options = ResolveOptions::default();
        options.session = self.seed.session;
        let value = self
            .seed
            .container
            .resolve_token(self.seed.token.clone(), &options)?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Diagnostic rendering of the captured token.
    pub fn token_description(&self) -> String {
        self.seed.token.description()
    }
}

/// Positional arguments resolved for a constructor, consumed in order.
pub struct ResolvedArgs {
    target: &'static str,
    items: VecDeque<Injected>,
    cursor: usize,
}

impl ResolvedArgs {
    pub(crate) fn new(target: &'static str, items: Vec<Injected>) -> Self {
        Self {
            target,
            items: items.into(),
            cursor: 0,
        }
    }

    fn next_item(&mut self) -> DiResult<Injected> {
        self.cursor += 1;
        self.items.pop_front().ok_or_else(|| DiError::UnresolvableParameter {
            target: self.target,
            parameter: format!("#{}", self.cursor),
            reason: "constructor consumed more parameters than were declared".to_string(),
        })
    }

    fn parameter_error(&self, reason: &str) -> DiError {
        DiError::UnresolvableParameter {
            target: self.target,
            parameter: format!("#{}", self.cursor),
            reason: reason.to_string(),
        }
    }

    /// Takes the next required dependency.
    pub fn take<T: Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        match self.next_item()? {
            Injected::Instance(value) => value
                .downcast::<T>()
                .map_err(|_| self.parameter_error("resolved value has an unexpected type")),
            Injected::Absent => {
                Err(self.parameter_error("dependency was declared optional; use take_optional"))
            }
            Injected::Lazy(_) => {
                Err(self.parameter_error("dependency was declared lazy; use take_lazy"))
            }
        }
    }

    /// Takes the next optional dependency, `None` when absent.
    pub fn take_optional<T: Send + Sync + 'static>(&mut self) -> DiResult<Option<Arc<T>>> {
        match self.next_item()? {
            Injected::Instance(value) => value
                .downcast::<T>()
                .map(Some)
                .map_err(|_| self.parameter_error("resolved value has an unexpected type")),
            Injected::Absent => Ok(None),
            Injected::Lazy(_) => {
                Err(self.parameter_error("dependency was declared lazy; use take_lazy"))
            }
        }
    }

    /// Takes the next lazily-declared dependency as a [`Lazy`] thunk.
    pub fn take_lazy<T: Send + Sync + 'static>(&mut self) -> DiResult<Lazy<T>> {
        match self.next_item()? {
            Injected::Lazy(seed) => Ok(Lazy {
                seed,
                _marker: PhantomData,
            }),
            _ => Err(self.parameter_error("dependency was not declared lazy")),
        }
    }
}
