//! Prints messages to standard output.

use crate::context::Context;
use crate::core::{parse_config, Driver, DriverConfig, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DRIVER_TYPE: &str = "stdout";

/// The line format for stdout output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Plain,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct StdoutConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct StdoutDriver {
    format: OutputFormat,
}

impl StdoutDriver {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn from_config(config: &DriverConfig) -> Result<Self, DispatchError> {
        let config: StdoutConfig = parse_config(DRIVER_TYPE, config)?;
        Ok(Self::new(config.format))
    }

    /// Formats one message as a single output line.
    pub fn format_line(&self, msg: &Message) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "receiver": msg.receiver(),
                "content": msg.content(),
                "metadata": msg.metadata(),
            })
            .to_string(),
            OutputFormat::Plain => {
                let mut keys: Vec<&String> = msg.metadata().keys().collect();
                keys.sort();
                let metadata: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}={}", k, msg.metadata()[k]))
                    .collect();
                format!(
                    "receiver={}, content={}, metadata={{{}}}",
                    msg.receiver(),
                    msg.content(),
                    metadata.join(", ")
                )
            }
        }
    }
}

#[async_trait]
impl Driver for StdoutDriver {
    fn name(&self) -> &str {
        DRIVER_TYPE
    }

    fn driver_type(&self) -> &str {
        DRIVER_TYPE
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        println!("{}", self.format_line(msg));
        Ok(())
    }

    fn stop(&self) {}
}
