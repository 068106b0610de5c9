/// msgdispatch - A pluggable outbound notification dispatcher
///
/// Callers submit a message; the dispatcher resolves it to a named channel,
/// runs it through the channel's middleware-wrapped driver and returns the
/// outcome synchronously.
pub mod app;
pub mod builder;
pub mod channel;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod drivers;
pub mod error;
pub mod middleware;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export core types for convenience
pub use crate::builder::BuilderRegistry;
pub use crate::channel::{Channel, ChannelConfig, Manager, Mapping};
pub use crate::context::Context;
pub use crate::core::*;
pub use crate::error::DispatchError;
pub use crate::middleware::{Middleware, Middlewares};
