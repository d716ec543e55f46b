//! Instance lifetime policies.

use std::fmt;

/// Lifetime policy governing how resolved instances are cached.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use wirebox::{Blueprint, Container, Lifetime, RegisterOptions};
///
/// struct Clock;
///
/// let container = Container::new();
/// container
///     .register(
///         Blueprint::from_factory(|| Clock),
///         RegisterOptions::new().lifetime(Lifetime::Transient),
///     )
///     .unwrap();
///
/// let a = container.resolve::<Clock>().unwrap();
/// let b = container.resolve::<Clock>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b)); // transient: fresh every time
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance per container, created on first resolution and cached in
    /// the registration's singleton slot for the life of the registry. A
    /// failed first attempt leaves the slot empty so a later resolution
    /// retries.
    Singleton,
    /// One instance per session. Requires an ambient or explicitly supplied
    /// session; repeated resolutions under the same session share the cached
    /// instance, different sessions get independent ones.
    Scoped,
    /// A fresh instance on every resolution, never cached.
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Lifetime::Singleton
    }
}

impl Lifetime {
    /// Lowercase label used in events and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
