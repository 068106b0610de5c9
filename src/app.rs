//! Assembles a dispatcher from settings.

use crate::builder::BuilderRegistry;
use crate::channel::{Manager, Mapping};
use crate::config::Settings;
use crate::context::Context;
use crate::core::{Message, TemplateSource};
use crate::error::DispatchError;
use crate::middleware::template::StaticTemplateSource;
use crate::middleware::{logger, template, timeout, validator, Middlewares};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Middleware priorities. Lower numbers wrap further out.
pub const LOGGER_PRIORITY: i32 = 10;
pub const TIMEOUT_PRIORITY: i32 = 20;
pub const VALIDATOR_PRIORITY: i32 = 30;
pub const TEMPLATE_PRIORITY: i32 = 40;

/// A running dispatcher: the builder registry and the channel manager.
pub struct App {
    registry: Arc<BuilderRegistry>,
    manager: Arc<Manager>,
}

impl App {
    /// Builds the middleware chain, mapping and channels described by
    /// `settings`, using the built-in drivers.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_registry(settings, Arc::new(BuilderRegistry::with_defaults()))
    }

    /// Like [`App::from_settings`] with a caller-provided builder registry.
    pub fn with_registry(settings: &Settings, registry: Arc<BuilderRegistry>) -> Result<Self> {
        settings.validate()?;

        let templates: Arc<dyn TemplateSource> =
            Arc::new(StaticTemplateSource::new(settings.templates.clone())?);
        let middlewares = build_middlewares(settings, templates)?;

        let mapping = Arc::new(Mapping::new());
        mapping.set_many(
            settings
                .defaults
                .iter()
                .map(|(kind, channel)| (kind.as_str(), channel.as_str())),
        );

        let manager = Arc::new(Manager::with_mapping(middlewares, mapping));
        manager.build_and_upsert_channels(&registry, &settings.channels)?;
        info!(
            channels = manager.len(),
            templates = settings.templates.len(),
            "Dispatcher ready"
        );

        Ok(Self { registry, manager })
    }

    pub fn registry(&self) -> &Arc<BuilderRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        self.manager.send(ctx, msg).await
    }

    /// Stops every channel.
    pub fn shutdown(&self) {
        info!("Shutting down dispatcher");
        self.manager.stop();
    }
}

/// Builds the standard middleware chain for `settings`.
pub fn build_middlewares(
    settings: &Settings,
    templates: Arc<dyn TemplateSource>,
) -> Result<Middlewares, DispatchError> {
    let mut chain = Middlewares::new();
    chain.push(logger::new(LOGGER_PRIORITY));
    if let Some(ms) = settings.send_timeout_ms {
        chain.push(timeout::new(TIMEOUT_PRIORITY, Duration::from_millis(ms))?);
    }
    if settings.require_receiver {
        chain.push(validator::new(VALIDATOR_PRIORITY, validator::non_empty));
    }
    chain.push(template::new(TEMPLATE_PRIORITY, templates));
    Ok(chain)
}
