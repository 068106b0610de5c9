//! Suppresses messages before they reach the driver.

use super::Middleware;
use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Returns `Ok(true)` to drop the message, `Ok(false)` to let it through.
pub type Predicate = Arc<dyn Fn(&Context, &Message) -> Result<bool, DispatchError> + Send + Sync>;

pub const NAME: &str = "filter";

/// Creates a filter middleware.
///
/// A suppressed message makes `send` return `Ok(())`; a predicate error is
/// returned as-is. In both cases the wrapped driver is not called.
pub fn new<F>(priority: i32, predicate: F) -> Middleware
where
    F: Fn(&Context, &Message) -> Result<bool, DispatchError> + Send + Sync + 'static,
{
    let predicate: Predicate = Arc::new(predicate);
    Middleware::new(NAME, priority, move |inner| {
        Arc::new(FilterDriver {
            inner,
            predicate: predicate.clone(),
        }) as Arc<dyn Driver>
    })
}

struct FilterDriver {
    inner: Arc<dyn Driver>,
    predicate: Predicate,
}

#[async_trait]
impl Driver for FilterDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        if (self.predicate)(ctx, msg)? {
            debug!(
                channel = ctx.channel().unwrap_or_default(),
                receiver = msg.receiver(),
                "Message suppressed by filter"
            );
            return Ok(());
        }
        self.inner.send(ctx, msg).await
    }

    fn stop(&self) {
        self.inner.stop()
    }
}
