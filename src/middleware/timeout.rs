//! Bounds how long a send may take.

use super::Middleware;
use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const NAME: &str = "timeout";

/// Creates a middleware that gives every send a deadline of `timeout` from
/// the moment it starts (or the caller's deadline, if that is sooner).
///
/// The send is abandoned when the deadline passes even if the driver does
/// not watch its context, so the outer call returns in bounded time.
pub fn new(priority: i32, timeout: Duration) -> Result<Middleware, DispatchError> {
    if timeout.is_zero() {
        return Err(DispatchError::invalid_config(NAME, "timeout must be positive"));
    }
    Ok(Middleware::new(NAME, priority, move |inner| {
        Arc::new(TimeoutDriver { inner, timeout }) as Arc<dyn Driver>
    }))
}

struct TimeoutDriver {
    inner: Arc<dyn Driver>,
    timeout: Duration,
}

#[async_trait]
impl Driver for TimeoutDriver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        // The derived context lives only for this call.
        let ctx = ctx.with_timeout(self.timeout);
        ctx.run(self.inner.send(&ctx, msg)).await
    }

    fn stop(&self) {
        self.inner.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDriver, SlowDriver};
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(new(0, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_slow_driver_hits_deadline() {
        let slow = Arc::new(SlowDriver::new(Duration::from_secs(5)));
        let completed = slow.completed.clone();
        let driver = new(0, Duration::from_millis(50)).unwrap().wrap(slow);

        let start = Instant::now();
        let err = driver
            .send(&Context::background(), &Message::new("r", "c"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::DeadlineExceeded));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fast_driver_is_unaffected() {
        let base = Arc::new(RecordingDriver::new("rec", "test"));
        let driver = new(0, Duration::from_secs(1)).unwrap().wrap(base.clone());

        driver
            .send(&Context::background(), &Message::new("r", "c"))
            .await
            .unwrap();
        assert_eq!(base.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_caller_deadline_still_applies() {
        let slow = Arc::new(SlowDriver::new(Duration::from_secs(5)));
        let driver = new(0, Duration::from_secs(60)).unwrap().wrap(slow);

        let ctx = Context::background().with_timeout(Duration::from_millis(30));
        let start = Instant::now();
        let result = driver.send(&ctx, &Message::new("r", "c")).await;

        assert!(matches!(result, Err(DispatchError::DeadlineExceeded)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unbounded_timeout_does_not_panic() {
        let base = Arc::new(RecordingDriver::new("rec", "test"));
        let driver = new(0, Duration::MAX).unwrap().wrap(base.clone());

        driver
            .send(&Context::background(), &Message::new("r", "c"))
            .await
            .unwrap();
        assert_eq!(base.sent().len(), 1);
    }
}
