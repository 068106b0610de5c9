//! Driver doubles for unit and integration tests.

use crate::context::Context;
use crate::core::{Driver, Message};
use crate::error::DispatchError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A driver that records every message it receives.
#[derive(Debug)]
pub struct RecordingDriver {
    name: String,
    driver_type: String,
    pub sent: Mutex<Vec<Message>>,
    /// Channel names seen on the context of each send.
    pub channels: Mutex<Vec<Option<String>>>,
    pub stop_calls: AtomicUsize,
    fail_on_send: AtomicBool,
}

impl RecordingDriver {
    pub fn new(name: &str, driver_type: &str) -> Self {
        Self {
            name: name.to_string(),
            driver_type: driver_type.to_string(),
            sent: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            stop_calls: AtomicUsize::new(0),
            fail_on_send: AtomicBool::new(false),
        }
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_type(&self) -> &str {
        &self.driver_type
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        if self.fail_on_send.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("transport failure from '{}'", self.name).into());
        }
        self.sent.lock().unwrap().push(msg.clone());
        self.channels
            .lock()
            .unwrap()
            .push(ctx.channel().map(str::to_string));
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A driver that sleeps for a fixed time and ignores its context.
#[derive(Debug)]
pub struct SlowDriver {
    delay: Duration,
    pub completed: Arc<AtomicUsize>,
}

impl SlowDriver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Driver for SlowDriver {
    fn name(&self) -> &str {
        "slow"
    }

    fn driver_type(&self) -> &str {
        "slow"
    }

    async fn send(&self, _ctx: &Context, _msg: &Message) -> Result<(), DispatchError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {}
}
