//! Configuration management for msgdispatch
//!
//! This module defines the `Settings` struct, responsible for holding the
//! dispatcher's channels, default-channel mappings, templates and middleware
//! switches. It uses the `figment` crate to layer built-in defaults, a
//! `msgdispatch.toml` file, `MSGDISPATCH_` environment variables and
//! command-line flags.

use crate::channel::ChannelConfig;
use crate::cli::Cli;
use crate::core::Template;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Settings file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "msgdispatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// The logging level for the application.
    pub log_level: String,
    /// Deadline applied to every send, in milliseconds. Unset disables the
    /// timeout middleware.
    #[serde(default)]
    pub send_timeout_ms: Option<u64>,
    /// Reject messages whose receiver is blank before they reach a driver.
    #[serde(default)]
    pub require_receiver: bool,
    /// Channels to build at startup.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Default channel per message type.
    #[serde(default)]
    pub defaults: HashMap<String, String>,
    /// Templates available to `tmpl:<name>` content.
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl Settings {
    /// Loads the settings by layering sources: defaults, file, environment,
    /// and CLI args.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Allow overriding with environment variables, e.g., MSGDISPATCH_LOG_LEVEL=debug
            .merge(Env::prefixed("MSGDISPATCH_"))
            .merge(cli.clone())
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings that cannot produce a working dispatcher.
    pub fn validate(&self) -> Result<()> {
        for (i, channel) in self.channels.iter().enumerate() {
            if channel.name.is_empty() {
                anyhow::bail!("channel #{} has no name", i + 1);
            }
            if channel.driver.is_empty() {
                anyhow::bail!("the driver name of channel named '{}' must not be empty", channel.name);
            }
            if self.channels[..i].iter().any(|c| c.name == channel.name) {
                anyhow::bail!("channel named '{}' is defined more than once", channel.name);
            }
        }
        if self.send_timeout_ms == Some(0) {
            anyhow::bail!("send_timeout_ms must be positive");
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            send_timeout_ms: None,
            require_receiver: false,
            channels: Vec::new(),
            defaults: HashMap::new(),
            templates: Vec::new(),
        }
    }
}
