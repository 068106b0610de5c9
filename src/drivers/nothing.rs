//! A driver that accepts and discards every message.

use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;

pub const DRIVER_TYPE: &str = "nothing";

#[derive(Debug, Clone, Copy, Default)]
pub struct NothingDriver;

#[async_trait]
impl Driver for NothingDriver {
    fn name(&self) -> &str {
        DRIVER_TYPE
    }

    fn driver_type(&self) -> &str {
        DRIVER_TYPE
    }

    async fn send(&self, _ctx: &Context, _msg: &Message) -> Result<(), DispatchError> {
        Ok(())
    }

    fn stop(&self) {}
}
