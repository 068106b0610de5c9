//! The channel registry.
//!
//! Mutations take a lock, change the private map, and then publish a fresh
//! copy of it. Lookups and sends only load the published copy, so they
//! never wait on a writer and never see a half-applied change.

use super::mapping::Mapping;
use super::{Channel, ChannelConfig};
use crate::builder::BuilderRegistry;
use crate::context::Context;
use crate::core::Message;
use crate::error::DispatchError;
use crate::middleware::Middlewares;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

type ChannelMap = HashMap<String, Arc<Channel>>;

/// Holds the live channels and dispatches messages to them.
#[derive(Debug)]
pub struct Manager {
    middlewares: Middlewares,
    mapping: Arc<Mapping>,
    channels: Mutex<ChannelMap>,
    snapshot: ArcSwap<ChannelMap>,
}

impl Manager {
    /// Creates a manager that wraps every registered driver with
    /// `middlewares` and owns a fresh [`Mapping`].
    pub fn new(middlewares: Middlewares) -> Self {
        Self::with_mapping(middlewares, Arc::new(Mapping::new()))
    }

    /// Creates a manager that resolves default channels through `mapping`.
    pub fn with_mapping(middlewares: Middlewares, mapping: Arc<Mapping>) -> Self {
        Self {
            middlewares,
            mapping,
            channels: Mutex::new(ChannelMap::new()),
            snapshot: ArcSwap::from_pointee(ChannelMap::new()),
        }
    }

    pub fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    pub fn middlewares(&self) -> &Middlewares {
        &self.middlewares
    }

    fn lock(&self) -> MutexGuard<'_, ChannelMap> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, channels: &ChannelMap) {
        self.snapshot.store(Arc::new(channels.clone()));
    }

    /// Registers a new channel.
    ///
    /// # Returns
    /// * `Err(DispatchError::ChannelExists)` if the name is taken. The
    ///   existing channel is left alone and the rejected channel's driver is
    ///   stopped, since the manager took ownership of it.
    pub fn add_channel(&self, channel: Channel) -> Result<(), DispatchError> {
        let mut channels = self.lock();
        if channels.contains_key(channel.name()) {
            channel.stop();
            return Err(DispatchError::ChannelExists(channel.name().to_string()));
        }

        let channel = channel.wrapped(&self.middlewares);
        info!(channel = %channel.name(), driver = %channel.driver_name(), "Adding channel");
        channels.insert(channel.name().to_string(), Arc::new(channel));
        self.publish(&channels);
        Ok(())
    }

    /// Adds or replaces channels, stopping the driver of every channel that
    /// gets replaced. Publishes once for the whole batch.
    pub fn upsert_channels<I>(&self, new_channels: I)
    where
        I: IntoIterator<Item = Channel>,
    {
        let mut channels = self.lock();
        for channel in new_channels {
            if let Some(old) = channels.remove(channel.name()) {
                debug!(channel = %old.name(), "Replacing channel");
                old.stop();
            }
            let channel = channel.wrapped(&self.middlewares);
            info!(channel = %channel.name(), driver = %channel.driver_name(), "Upserting channel");
            channels.insert(channel.name().to_string(), Arc::new(channel));
        }
        self.publish(&channels);
    }

    /// Removes a channel and stops its driver. Does nothing if absent.
    pub fn del_channel(&self, name: &str) {
        let mut channels = self.lock();
        if let Some(old) = channels.remove(name) {
            info!(channel = name, "Deleting channel");
            old.stop();
            self.publish(&channels);
        }
    }

    pub fn get_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.snapshot.load().get(name).cloned()
    }

    /// Returns every channel, sorted by name. The vector is the caller's.
    pub fn get_channels(&self) -> Vec<Arc<Channel>> {
        let mut channels: Vec<Arc<Channel>> = self.snapshot.load().values().cloned().collect();
        channels.sort_by(|a, b| a.name().cmp(b.name()));
        channels
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds every configured channel and upserts them together.
    ///
    /// Nothing is registered if any build fails; channels built before the
    /// failure are stopped. Channels flagged `is_default` become the default
    /// for their driver type.
    pub fn build_and_upsert_channels(
        &self,
        registry: &BuilderRegistry,
        configs: &[ChannelConfig],
    ) -> Result<(), DispatchError> {
        let mut built = Vec::with_capacity(configs.len());
        for config in configs {
            match config.build(registry) {
                Ok(channel) => built.push(channel),
                Err(e) => {
                    built.iter().for_each(Channel::stop);
                    return Err(e);
                }
            }
        }

        let defaults: Vec<(String, String)> = built
            .iter()
            .zip(configs)
            .filter(|(_, config)| config.is_default)
            .map(|(channel, _)| (channel.driver_type().to_string(), channel.name().to_string()))
            .collect();

        self.upsert_channels(built);
        self.mapping
            .set_many(defaults.iter().map(|(kind, name)| (kind.as_str(), name.as_str())));
        Ok(())
    }

    /// Sends `msg` through its channel.
    ///
    /// A message without a name goes to the default channel for its type.
    #[instrument(skip_all, fields(channel = msg.name(), kind = msg.kind()))]
    pub async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        let name = if msg.name().is_empty() {
            self.mapping.default_channel_name(msg)?
        } else {
            msg.name().to_string()
        };

        let channel = self
            .get_channel(&name)
            .ok_or(DispatchError::ChannelNotFound(name))?;
        channel.send(ctx, msg).await
    }

    /// Stops every registered channel's driver. Safe to call repeatedly.
    pub fn stop(&self) {
        let channels = self.get_channels();
        info!(count = channels.len(), "Stopping all channels");
        for channel in channels {
            channel.stop();
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(Middlewares::new())
    }
}
