//! Error types shared by the dispatch core.

use thiserror::Error;

/// Every failure a `Send`, a build, or a registry mutation can report.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no driver builder named '{0}'")]
    NoBuilder(String),

    #[error("invalid config for driver '{driver}': {reason}")]
    InvalidConfig { driver: String, reason: String },

    #[error("channel named '{0}' already exists")]
    ChannelExists(String),

    #[error("no channel named '{0}'")]
    ChannelNotFound(String),

    #[error("missing channel name or driver type")]
    MissingChannelName,

    #[error("invalid receiver '{receiver}': {reason}")]
    InvalidReceiver { receiver: String, reason: String },

    #[error("template '{name}' is unavailable: {reason}")]
    Template { name: String, reason: String },

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context cancelled")]
    Cancelled,

    #[error("driver '{0}' has been stopped")]
    DriverStopped(String),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl DispatchError {
    /// True for the failures that mean "could not work out where to send".
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::MissingChannelName | Self::ChannelNotFound(_))
    }

    /// True for failures raised while turning configuration into a driver.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoBuilder(_) | Self::InvalidConfig { .. })
    }

    pub(crate) fn invalid_config(driver: &str, reason: impl ToString) -> Self {
        Self::InvalidConfig {
            driver: driver.to_string(),
            reason: reason.to_string(),
        }
    }
}
