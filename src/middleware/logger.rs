//! Emits one structured event per send.

use super::Middleware;
use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub const NAME: &str = "logger";

/// Creates a middleware that logs every send after it completes, whatever
/// the outcome, and records send metrics.
pub fn new(priority: i32) -> Middleware {
    Middleware::new(NAME, priority, |inner| {
        Arc::new(LoggerDriver { inner }) as Arc<dyn Driver>
    })
}

struct LoggerDriver {
    inner: Arc<dyn Driver>,
}

#[async_trait]
impl Driver for LoggerDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        let started_at = Utc::now().to_rfc3339();
        let start = Instant::now();
        let result = self.inner.send(ctx, msg).await;
        let elapsed = start.elapsed();

        let channel = ctx.channel().unwrap_or_default().to_string();
        let driver_type = self.inner.driver_type();
        let elapsed_ms = elapsed.as_millis() as u64;

        match &result {
            Ok(()) => info!(
                channel = %channel,
                driver_type,
                receiver = msg.receiver(),
                content = %msg.content(),
                metadata = ?msg.metadata(),
                started_at = %started_at,
                elapsed_ms,
                "send message notice"
            ),
            Err(e) => error!(
                channel = %channel,
                driver_type,
                receiver = msg.receiver(),
                content = %msg.content(),
                metadata = ?msg.metadata(),
                started_at = %started_at,
                elapsed_ms,
                error = %e,
                "send message notice"
            ),
        }

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("notifications_sent_total", "channel" => channel, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("notification_send_duration_seconds").record(elapsed.as_secs_f64());

        result
    }

    fn stop(&self) {
        self.inner.stop()
    }
}
