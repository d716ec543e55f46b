//! Request tokens identifying registered targets.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

/// Placeholder rendered for a deferred token that has not been unwrapped yet.
pub(crate) const DEFERRED_PLACEHOLDER: &str = "<deferred>";

/// Opaque key identifying a requested dependency.
///
/// A token is either a globally-unique string alias, the identity of a
/// constructible type, or a deferred reference that produces the real token
/// on demand. Deferred tokens exist to break declaration-order cycles: two
/// mutually-referring registrations can each name the other through a closure
/// that is only invoked at resolution time.
///
/// # Examples
///
/// ```rust
/// use wirebox::Token;
///
/// struct Database;
///
/// let by_name = Token::name("database");
/// let by_type = Token::of::<Database>();
/// let deferred = Token::deferred(|| Token::name("database"));
///
/// assert_eq!(by_name.description(), "database");
/// assert_eq!(deferred.canonical().unwrap().description(), "database");
/// assert!(by_type.description().contains("Database"));
/// ```
#[derive(Clone)]
pub enum Token {
    /// String alias, unique per registry.
    Name(Arc<str>),
    /// Type identity plus `std::any::type_name` for diagnostics.
    Type(TypeId, &'static str),
    /// Wrapper producing the real token when invoked.
    Deferred(DeferredToken),
}

/// Deferred token wrapper holding a zero-argument producer.
#[derive(Clone)]
pub struct DeferredToken {
    produce: Arc<dyn Fn() -> Token + Send + Sync>,
}

impl Token {
    /// Creates a string-alias token.
    pub fn name(name: impl AsRef<str>) -> Self {
        Token::Name(Arc::from(name.as_ref()))
    }

    /// Creates a token from the identity of a constructible type.
    pub fn of<T: 'static>() -> Self {
        Token::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Creates a deferred token from a producer closure.
    ///
    /// The closure is invoked only when the token is unwrapped, which makes
    /// it possible to reference a token that is not declarable yet at the
    /// point of use.
    pub fn deferred<F>(produce: F) -> Self
    where
        F: Fn() -> Token + Send + Sync + 'static,
    {
        Token::Deferred(DeferredToken {
            produce: Arc::new(produce),
        })
    }

    /// Whether this token is a deferred reference.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Token::Deferred(_))
    }

    /// Unwraps deferred layers until a name or type token remains.
    ///
    /// Producers may hand back further deferred tokens; every layer is peeled
    /// with a visited check on producer identity, so a reference that loops
    /// on itself fails with [`DiError::CircularReference`] instead of
    /// spinning forever.
    pub fn canonical(&self) -> DiResult<Token> {
        let mut seen: Vec<*const ()> = Vec::new();
        let mut current = self.clone();
        loop {
            match current {
                Token::Deferred(deferred) => {
                    let identity = Arc::as_ptr(&deferred.produce) as *const ();
                    if seen.contains(&identity) {
                        return Err(DiError::CircularReference { depth: seen.len() });
                    }
                    seen.push(identity);
                    current = (deferred.produce)();
                }
                resolved => return Ok(resolved),
            }
        }
    }

    /// Stable human-readable rendering for diagnostics and filters.
    ///
    /// Names render as themselves, type tokens as their type name, and
    /// not-yet-unwrapped deferred references as a fixed placeholder.
    pub fn description(&self) -> String {
        match self {
            Token::Name(name) => name.to_string(),
            Token::Type(_, type_name) => (*type_name).to_string(),
            Token::Deferred(_) => DEFERRED_PLACEHOLDER.to_string(),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Name(a), Token::Name(b)) => a == b,
            (Token::Type(a, _), Token::Type(b, _)) => a == b,
            (Token::Deferred(a), Token::Deferred(b)) => Arc::ptr_eq(&a.produce, &b.produce),
            _ => false,
        }
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.description())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Token::name(name)
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token::Name(Arc::from(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_peels_nested_deferred_layers() {
        let token = Token::deferred(|| Token::deferred(|| Token::name("leaf")));
        let resolved = token.canonical().unwrap();
        assert_eq!(resolved.description(), "leaf");
    }

    #[test]
    fn canonical_detects_self_referential_loop() {
        let slot: Arc<parking_lot::Mutex<Option<Token>>> = Arc::new(parking_lot::Mutex::new(None));
        let producer_slot = slot.clone();
        let token = Token::deferred(move || producer_slot.lock().clone().expect("slot filled"));
        *slot.lock() = Some(token.clone());

        let err = token.canonical().unwrap_err();
        assert!(matches!(err, DiError::CircularReference { .. }));
    }

    #[test]
    fn deferred_description_is_placeholder() {
        let token = Token::deferred(|| Token::name("later"));
        assert_eq!(token.description(), DEFERRED_PLACEHOLDER);
    }
}
