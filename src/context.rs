//! Per-call dispatch context.
//!
//! A `Context` travels with every `send` through the middleware chain and
//! into the driver. It carries an optional deadline, the cancellation signals
//! of every context it was derived from, and the name of the channel doing
//! the dispatch. Deriving a new context never affects the one it was derived
//! from.

use crate::error::DispatchError;
use futures::future::{select_all, FutureExt};
use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    // Every cancellation signal inherited from parent contexts.
    cancel: Vec<watch::Receiver<bool>>,
    channel: Option<Arc<str>>,
}

impl Context {
    /// An empty context that never expires and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that expires after `timeout`, or earlier if the
    /// parent already has a tighter deadline.
    ///
    /// A timeout too large to represent adds no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => self.with_deadline(at),
            None => self.clone(),
        }
    }

    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= at => current,
            _ => at,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Derives a context that is cancelled once `true` is published on `rx`
    /// or when any of the parent's signals fire.
    pub fn with_cancel(&self, rx: watch::Receiver<bool>) -> Self {
        let mut ctx = self.clone();
        ctx.cancel.push(rx);
        ctx
    }

    pub fn with_channel(&self, name: &str) -> Self {
        Self {
            channel: Some(Arc::from(name)),
            ..self.clone()
        }
    }

    /// The channel currently dispatching, if any.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason the context is done, if it already is.
    pub fn err(&self) -> Option<DispatchError> {
        if self.cancel.iter().any(|rx| *rx.borrow()) {
            return Some(DispatchError::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(DispatchError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the deadline passes or cancellation is signalled.
    ///
    /// Never resolves for a context with neither.
    pub async fn done(&self) -> DispatchError {
        let expired = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };

        let cancelled = async {
            if self.cancel.is_empty() {
                return pending::<()>().await;
            }
            select_all(self.cancel.iter().cloned().map(|rx| wait_cancelled(rx).boxed())).await;
        };

        tokio::select! {
            _ = cancelled => DispatchError::Cancelled,
            _ = expired => DispatchError::DeadlineExceeded,
        }
    }

    /// Runs `fut` until it completes or the context is done, whichever comes
    /// first. Dropping `fut` on expiry is what cancels the in-flight work.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, DispatchError>
    where
        F: Future<Output = Result<T, DispatchError>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            result = fut => result,
            err = self.done() => Err(err),
        }
    }
}

/// Resolves once `true` is published on `rx`.
async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without cancelling.
            return pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tighter_deadline_wins() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let first = ctx.deadline().unwrap();

        let looser = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(looser.deadline(), Some(first));

        let tighter = ctx.with_deadline(first - Duration::from_millis(10));
        assert!(tighter.deadline().unwrap() < first);
    }

    #[test]
    fn test_derived_context_does_not_touch_parent() {
        let parent = Context::background();
        let child = parent.with_channel("ops").with_timeout(Duration::from_secs(1));

        assert_eq!(child.channel(), Some("ops"));
        assert!(parent.channel().is_none());
        assert!(parent.deadline().is_none());
    }

    #[tokio::test]
    async fn test_run_returns_deadline_error() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DispatchError::DeadlineExceeded)));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_run_observes_cancellation() {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = Context::background().with_cancel(cancel_rx);

        let handle = tokio::spawn(async move {
            ctx.run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel_tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DispatchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_observes_parent_cancellation() {
        let (parent_tx, parent_rx) = watch::channel(false);
        let (_child_tx, child_rx) = watch::channel(false);
        let parent = Context::background().with_cancel(parent_rx);
        let child = parent.with_cancel(child_rx).with_channel("ops");

        let handle = tokio::spawn(async move {
            child
                .run(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        parent_tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DispatchError::Cancelled)));
        assert!(matches!(parent.err(), Some(DispatchError::Cancelled)));
    }

    #[test]
    fn test_child_cancellation_leaves_parent_alone() {
        let (_parent_tx, parent_rx) = watch::channel(false);
        let (child_tx, child_rx) = watch::channel(false);
        let parent = Context::background().with_cancel(parent_rx);
        let child = parent.with_cancel(child_rx);

        child_tx.send(true).unwrap();

        assert!(matches!(child.err(), Some(DispatchError::Cancelled)));
        assert!(parent.err().is_none());
    }

    #[test]
    fn test_unrepresentable_timeout_keeps_existing_deadline() {
        let unbounded = Context::background().with_timeout(Duration::MAX);
        assert!(unbounded.deadline().is_none());

        let bounded = Context::background().with_timeout(Duration::from_secs(1));
        let deadline = bounded.deadline();
        assert_eq!(bounded.with_timeout(Duration::MAX).deadline(), deadline);
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = Context::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!ctx.is_done());
    }
}
