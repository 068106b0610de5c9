//! End-to-end dispatch through the manager and the middleware chain.

use msgdispatch::middleware::template::StaticTemplateSource;
use msgdispatch::middleware::{filter, logger, template, timeout, validator};
use msgdispatch::testing::{RecordingDriver, SlowDriver};
use msgdispatch::{Channel, Context, DispatchError, Manager, Message, Middlewares, Template};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod helpers;
use helpers::{probe, Events};

#[tokio::test]
async fn test_chain_order_through_manager() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let chain = Middlewares::new()
        .with(probe("m3", 3, &events))
        .with(probe("m1", 1, &events))
        .with(probe("m2", 2, &events));
    let manager = Manager::new(chain);

    let base = Arc::new(RecordingDriver::new("rec", "email"));
    manager.add_channel(Channel::new("mail", base.clone())).unwrap();

    let msg = Message::new("ann@example.com", "hello").with_name("mail");
    manager.send(&Context::background(), &msg).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["pre:m1", "pre:m2", "pre:m3", "post:m3", "post:m2", "post:m1"]
    );
    assert_eq!(base.sent().len(), 1);
}

#[tokio::test]
async fn test_template_rendered_for_mapped_channel() {
    let source = StaticTemplateSource::new(vec![Template {
        name: "greet".into(),
        tmpl: "Hello {name}, you have {count} items".into(),
        args: vec!["name".into(), "count".into()],
    }])
    .unwrap();

    let chain = Middlewares::new()
        .with(logger::new(0))
        .with(validator::new(1, validator::email).for_type("email"))
        .with(template::new(2, Arc::new(source)));
    let manager = Manager::new(chain);

    let primary = Arc::new(RecordingDriver::new("rec", "email"));
    manager.add_channel(Channel::new("primary", primary.clone())).unwrap();
    manager.mapping().set("email", "primary");

    let msg = Message::new("ann@example.com", "tmpl:greet")
        .with_type("email")
        .with_meta("name", "Ann");
    manager.send(&Context::background(), &msg).await.unwrap();

    let sent = primary.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content().as_text(), Some("Hello Ann, you have  items"));

    // Validation runs before template lookup and stops the send.
    let bad = Message::new("ann", "tmpl:greet").with_type("email");
    let err = manager.send(&Context::background(), &bad).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidReceiver { .. }));
    assert_eq!(primary.sent().len(), 1);
}

#[tokio::test]
async fn test_filter_only_applies_to_matching_type() {
    let chain = Middlewares::new().with(
        filter::new(0, |_, msg| Ok(msg.metadata().contains_key("mute"))).for_type("webhook"),
    );
    let manager = Manager::new(chain);

    let hook = Arc::new(RecordingDriver::new("hook", "webhook"));
    let console = Arc::new(RecordingDriver::new("console", "stdout"));
    manager.upsert_channels([
        Channel::new("chat", hook.clone()),
        Channel::new("console", console.clone()),
    ]);

    let ctx = Context::background();
    for name in ["chat", "console"] {
        let msg = Message::new("ops", "hi").with_name(name).with_meta("mute", true);
        manager.send(&ctx, &msg).await.unwrap();
    }

    assert!(hook.sent().is_empty());
    assert_eq!(console.sent().len(), 1);
}

#[tokio::test]
async fn test_timeout_bounds_send_latency() {
    let chain = Middlewares::new().with(timeout::new(0, Duration::from_millis(100)).unwrap());
    let manager = Manager::new(chain);
    manager
        .add_channel(Channel::new("slow", Arc::new(SlowDriver::new(Duration::from_secs(10)))))
        .unwrap();

    let start = Instant::now();
    let err = manager
        .send(&Context::background(), &Message::new("r", "c").with_name("slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::DeadlineExceeded));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_transport_errors_are_returned_unchanged() {
    let manager = Manager::new(Middlewares::new().with(logger::new(0)));
    let base = Arc::new(RecordingDriver::new("rec", "email"));
    base.set_fail_on_send(true);
    manager.add_channel(Channel::new("mail", base)).unwrap();

    let err = manager
        .send(&Context::background(), &Message::new("r", "c").with_name("mail"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Transport(_)));
    assert!(!err.is_resolution());
}

#[tokio::test]
async fn test_concurrent_sends_share_one_driver() {
    let manager = Arc::new(Manager::default());
    let base = Arc::new(RecordingDriver::new("rec", "test"));
    manager.add_channel(Channel::new("ops", base.clone())).unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let msg = Message::new(format!("user-{}", i), "hi").with_name("ops");
            manager.send(&Context::background(), &msg).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(base.sent().len(), 32);
}
