//! Registry of driver factories, keyed by driver name.

use crate::core::{Driver, DriverConfig};
use crate::drivers;
use crate::error::DispatchError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Turns a configuration map into a ready driver.
pub type BuildFn =
    Arc<dyn Fn(&DriverConfig) -> Result<Arc<dyn Driver>, DispatchError> + Send + Sync>;

/// Maps a driver name to the factory that builds it.
///
/// Registration normally happens once at startup; the lock keeps concurrent
/// registration (e.g. from tests) safe.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: RwLock<HashMap<String, BuildFn>>,
}

impl BuilderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in drivers already registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        drivers::register_defaults(&registry);
        registry
    }

    /// Registers `build` under `name`. A later registration of the same name
    /// replaces the earlier one.
    pub fn register<F>(&self, name: &str, build: F)
    where
        F: Fn(&DriverConfig) -> Result<Arc<dyn Driver>, DispatchError> + Send + Sync + 'static,
    {
        debug!(driver = name, "Registering driver builder");
        self.builders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(build));
    }

    pub fn unregister(&self, name: &str) {
        self.builders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of every registered builder, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Builds a driver with the factory registered under `name`.
    ///
    /// # Returns
    /// * `Err(DispatchError::NoBuilder)` if nothing is registered under `name`
    /// * the factory's own error if the configuration is rejected
    pub fn build(&self, name: &str, config: &DriverConfig) -> Result<Arc<dyn Driver>, DispatchError> {
        // Clone the factory out so it runs without holding the lock.
        let build = self
            .builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NoBuilder(name.to_string()))?;
        build(config)
    }
}
