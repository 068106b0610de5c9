//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. Settings flags are merged on top of the `msgdispatch.toml`
//! file and environment variables; the remaining flags describe the message
//! to send.

use crate::core::{Message, Metadata};
use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata as ProviderMetadata, Profile, Provider,
};
use std::path::PathBuf;

/// Sends one notification through a configured channel.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The logging level (e.g. "debug", "info").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Deadline for the send in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Reject blank receivers before they reach a driver.
    #[arg(long)]
    pub require_receiver: bool,

    /// Channel to send through. Resolved from --kind when omitted.
    #[arg(long, value_name = "NAME")]
    pub channel: Option<String>,

    /// Message type used to pick the default channel.
    #[arg(long = "kind", value_name = "TYPE")]
    pub kind: Option<String>,

    /// Destination address.
    #[arg(short, long, default_value = "")]
    pub receiver: String,

    /// Message content, or `tmpl:<name>` to render a template.
    #[arg(long)]
    pub content: Option<String>,

    /// Metadata entries as key=value. Values that parse as JSON are kept typed.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, serde_json::Value)>,
}

fn parse_meta(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::from(value));
    Ok((key.to_string(), value))
}

impl Cli {
    /// Builds the message described by the send flags.
    pub fn message(&self) -> Option<Message> {
        let content = self.content.clone()?;
        let metadata: Metadata = self.meta.iter().cloned().collect();
        let mut msg = Message::new(self.receiver.clone(), content).with_metadata(metadata);
        if let Some(channel) = &self.channel {
            msg = msg.with_name(channel.clone());
        }
        if let Some(kind) = &self.kind {
            msg = msg.with_type(kind.clone());
        }
        Some(msg)
    }
}

impl Provider for Cli {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(timeout) = self.timeout_ms {
            dict.insert("send_timeout_ms".into(), Value::from(timeout));
        }

        // Only an explicit flag overrides the file; absence keeps its value.
        if self.require_receiver {
            dict.insert("require_receiver".into(), Value::from(true));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
