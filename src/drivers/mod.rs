//! Built-in drivers.
//!
//! Each driver parses the untyped channel configuration into its own config
//! struct when it is built and reports `InvalidConfig` if that fails.

pub mod nothing;
pub mod stdout;
pub mod webhook;

use crate::builder::BuilderRegistry;
use crate::core::Driver;
use std::sync::Arc;

/// Registers every built-in driver under its name.
pub fn register_defaults(registry: &BuilderRegistry) {
    registry.register(stdout::DRIVER_TYPE, |config| {
        Ok(Arc::new(stdout::StdoutDriver::from_config(config)?) as Arc<dyn Driver>)
    });
    registry.register(nothing::DRIVER_TYPE, |_| {
        Ok(Arc::new(nothing::NothingDriver) as Arc<dyn Driver>)
    });
    registry.register(webhook::DRIVER_TYPE, |config| {
        Ok(Arc::new(webhook::WebhookDriver::from_config(config)?) as Arc<dyn Driver>)
    });
}
