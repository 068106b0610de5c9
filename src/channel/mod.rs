//! Channels: named, configured driver instances.
//!
//! A channel owns exactly one driver. Once the channel is registered with a
//! [`Manager`], that driver is the middleware-wrapped one and the channel is
//! responsible for stopping it when it is replaced, removed or shut down.

pub mod manager;
pub mod mapping;

pub use manager::Manager;
pub use mapping::Mapping;

use crate::builder::BuilderRegistry;
use crate::context::Context;
use crate::core::{Driver, DriverConfig, Message, Metadata};
use crate::error::DispatchError;
use crate::middleware::Middlewares;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct Channel {
    name: String,
    driver_name: String,
    driver_type: String,
    config: DriverConfig,
    extra: Metadata,
    driver: Arc<dyn Driver>,
    stopped: AtomicBool,
}

impl Channel {
    /// Creates a channel around an already-built driver.
    pub fn new(name: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            name: name.into(),
            driver_name: driver.name().to_string(),
            driver_type: driver.driver_type().to_string(),
            config: DriverConfig::new(),
            extra: Metadata::new(),
            driver,
            stopped: AtomicBool::new(false),
        }
    }

    /// Builds the driver registered as `driver_name` from `config` and wraps
    /// it in a new channel.
    pub fn build(
        registry: &BuilderRegistry,
        name: &str,
        driver_name: &str,
        config: DriverConfig,
    ) -> Result<Self, DispatchError> {
        let driver = registry.build(driver_name, &config)?;
        let mut channel = Self::new(name, driver);
        channel.driver_name = driver_name.to_string();
        channel.config = config;
        Ok(channel)
    }

    /// Attaches caller metadata to the channel.
    pub fn with_extra(mut self, extra: Metadata) -> Self {
        self.extra = extra;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn driver_type(&self) -> &str {
        &self.driver_type
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn extra(&self) -> &Metadata {
        &self.extra
    }

    /// Sends through the channel's driver with the channel name on the context.
    pub async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        self.driver.send(&ctx.with_channel(&self.name), msg).await
    }

    /// Stops the driver. Only the first call reaches the driver.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(channel = %self.name, driver = %self.driver_name, "Stopping channel driver");
            self.driver.stop();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Replaces the driver with its middleware-wrapped form. Consumes the
    /// channel so a registered channel can never be wrapped twice.
    pub(crate) fn wrapped(mut self, middlewares: &Middlewares) -> Self {
        self.driver = middlewares.wrap(self.driver);
        self
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("driver_name", &self.driver_name)
            .field("driver_type", &self.driver_type)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel(name={}, driver={})", self.name, self.driver_name)
    }
}

/// A channel as described in configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelConfig {
    pub name: String,
    /// Name of the driver builder to use.
    pub driver: String,
    #[serde(default)]
    pub config: DriverConfig,
    #[serde(default)]
    pub extra: Metadata,
    /// Makes this channel the default for its driver type.
    #[serde(default)]
    pub is_default: bool,
}

impl ChannelConfig {
    pub fn build(&self, registry: &BuilderRegistry) -> Result<Channel, DispatchError> {
        if self.driver.is_empty() {
            return Err(DispatchError::invalid_config(
                &self.name,
                format!("the driver name of channel '{}' must not be empty", self.name),
            ));
        }
        Ok(Channel::build(registry, &self.name, &self.driver, self.config.clone())?
            .with_extra(self.extra.clone()))
    }
}
