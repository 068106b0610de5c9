use msgdispatch::middleware::timeout;
use msgdispatch::testing::{RecordingDriver, SlowDriver};
use msgdispatch::{Channel, Context, DispatchError, Driver, Manager, Message, Middlewares};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[tokio::test]
async fn test_cancel_interrupts_in_flight_send() {
    let chain = Middlewares::new().with(timeout::new(0, Duration::from_secs(30)).unwrap());
    let manager = Manager::new(chain);
    let slow = Arc::new(SlowDriver::new(Duration::from_secs(30)));
    let completed = slow.completed.clone();
    manager.add_channel(Channel::new("slow", slow)).unwrap();

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
    });

    let start = Instant::now();
    let ctx = Context::background().with_cancel(rx);
    let err = manager
        .send(&ctx, &Message::new("r", "c").with_name("slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stop_reaches_each_driver_once() {
    let manager = Manager::default();
    let drivers: Vec<Arc<RecordingDriver>> = ["a", "b", "c"]
        .iter()
        .map(|name| Arc::new(RecordingDriver::new(name, "test")))
        .collect();
    manager.upsert_channels(
        ["a", "b", "c"]
            .iter()
            .zip(&drivers)
            .map(|(name, d)| Channel::new(*name, d.clone() as Arc<dyn Driver>)),
    );

    manager.stop();
    manager.stop();

    for driver in &drivers {
        assert_eq!(driver.stop_count(), 1);
    }
    // Stopping leaves the registry intact.
    assert_eq!(manager.len(), 3);
}
