#![allow(dead_code)]
use async_trait::async_trait;
use msgdispatch::{Context, DispatchError, Driver, Message, Middleware};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Shared log of "pre:<name>" / "post:<name>" events.
pub type Events = Arc<Mutex<Vec<String>>>;

/// A driver wrapper that records when it is entered and left.
struct Probe {
    label: String,
    events: Events,
    inner: Arc<dyn Driver>,
}

#[async_trait]
impl Driver for Probe {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_type(&self) -> &str {
        self.inner.driver_type()
    }

    async fn send(&self, ctx: &Context, msg: &Message) -> Result<(), DispatchError> {
        self.events.lock().unwrap().push(format!("pre:{}", self.label));
        let result = self.inner.send(ctx, msg).await;
        self.events.lock().unwrap().push(format!("post:{}", self.label));
        result
    }

    fn stop(&self) {
        self.inner.stop()
    }
}

/// Creates a middleware that records its position in the chain.
pub fn probe(name: &str, priority: i32, events: &Events) -> Middleware {
    let events = events.clone();
    let label = name.to_string();
    Middleware::new(name, priority, move |inner| {
        Arc::new(Probe {
            label: label.clone(),
            events: events.clone(),
            inner,
        }) as Arc<dyn Driver>
    })
}

/// Writes `toml` to a temporary settings file.
pub fn settings_file(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml).unwrap();
    file
}
