//! Modular registration: bundles of related registrations installed as one.

use tracing::debug;

use crate::container::Container;
use crate::error::DiResult;

/// A bundle of registrations installed together during bootstrap.
///
/// Installation is tracked by module name, so installing the same module a
/// second time is a no-op. This is the contract discovery layers and
/// application bootstrap code build on: they may hand the container the same
/// module reference repeatedly without double-registering anything.
///
/// # Examples
///
/// ```rust
/// use wirebox::{Blueprint, Container, DiResult, Module, RegisterOptions};
///
/// struct Clock;
///
/// struct CoreModule;
///
/// impl Module for CoreModule {
///     fn name(&self) -> &str {
///         "core"
///     }
///
///     fn register(&self, container: &Container) -> DiResult<()> {
///         container.register(Blueprint::from_factory(|| Clock), RegisterOptions::new())?;
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// assert!(container.install(&CoreModule).unwrap());
/// assert!(!container.install(&CoreModule).unwrap()); // already installed
/// ```
pub trait Module: Send + Sync {
    /// Stable identifier the container tracks installation by.
    fn name(&self) -> &str;

    /// Registers this module's targets.
    fn register(&self, container: &Container) -> DiResult<()>;
}

impl Container {
    /// Installs a module, returning `false` when it was already installed.
    ///
    /// A module whose registration fails is not recorded as installed, so the
    /// install can be retried.
    pub fn install(&self, module: &dyn Module) -> DiResult<bool> {
        let name = module.name().to_string();
        {
            let mut installed = self.shared.modules.lock();
            if installed.contains(&name) {
                debug!(module = %name, "module already installed, skipping");
                return Ok(false);
            }
            installed.insert(name.clone());
        }
        if let Err(error) = module.register(self) {
            self.shared.modules.lock().remove(&name);
            return Err(error);
        }
        debug!(module = %name, "module installed");
        Ok(true)
    }
}
