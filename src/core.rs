//! Core domain types and service traits for msgdispatch
//!
//! This module defines the message that callers submit, the transport
//! contract every driver implements, and the template contract the
//! rendering middleware consumes.

use crate::context::Context;
use crate::error::DispatchError;
use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// String-keyed metadata attached to a message.
pub type Metadata = HashMap<String, Value>;

/// Untyped driver configuration as it arrives from a settings file or a
/// database row. Drivers turn it into their own typed struct.
pub type DriverConfig = serde_json::Map<String, Value>;

/// The payload of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(Value),
}

impl Content {
    /// Returns the text if the content is string-valued.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Structured(Value::String(text)) => Some(text),
            Content::Structured(_) => None,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.write_str(text),
            Content::Structured(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Structured(value)
    }
}

/// A logical notification submitted for dispatch.
///
/// Fields are read-only once built. Middleware that needs different content
/// derives a new message with [`Message::with_content`] and leaves the
/// caller's copy alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Message {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    content: Content,
    #[serde(default)]
    receiver: String,
    #[serde(default)]
    metadata: Metadata,
}

impl Message {
    pub fn new(receiver: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            receiver: receiver.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Targets an explicit channel.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the type used to find a default channel when no name is given.
    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// A message template with `{placeholder}` markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Template {
    pub name: String,
    pub tmpl: String,
    /// Placeholder names in substitution order.
    #[serde(default)]
    pub args: Vec<String>,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Sends messages to one kind of endpoint (email, chat webhook, stdout, ...).
///
/// A driver is shared by every concurrent `send` on its channel and must be
/// safe for that. Constructing one must not perform I/O beyond validating
/// its configuration.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Identity of the driver instance, usually the builder name.
    fn name(&self) -> &str;

    /// Transport category, e.g. "email" or "webhook".
    fn driver_type(&self) -> &str;

    /// Sends one message.
    ///
    /// # Returns
    /// * `Ok(())` once the transport accepted the message
    /// * `Err` for transport failures, or the context's error if it was
    ///   done before the send finished
    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError>;

    /// Releases transport resources. Safe to call more than once and while
    /// sends are still in flight.
    fn stop(&self);
}

/// Looks templates up by name for the rendering middleware.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// # Returns
    /// * `Ok(Some(template))` when the template exists
    /// * `Ok(None)` when there is no template with that name
    /// * `Err` if the backing store could not be queried
    async fn get_template(&self, ctx: &Context, name: &str) -> Result<Option<Template>>;
}

/// Parses an untyped driver configuration into a driver's own config struct.
pub fn parse_config<T: DeserializeOwned>(
    driver: &str,
    config: &DriverConfig,
) -> Result<T, DispatchError> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| DispatchError::invalid_config(driver, e))
}

/// Textual form of a metadata value: strings verbatim, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
