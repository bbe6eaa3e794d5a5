use passvault::VaultError;
use passvault::service::event_bus::{self, Listener};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<u32>>,
}

impl Recorder {
    fn seen(&self) -> Vec<u32> {
        self.seen.lock().expect("poisoned").clone()
    }
}

#[ractor::async_trait]
impl Listener<u32> for Recorder {
    async fn on_message(&self, message: u32) -> Result<(), VaultError> {
        // vary the delivery time so ordering bugs show up
        tokio::time::sleep(Duration::from_millis(u64::from(message % 3))).await;
        self.seen.lock().expect("poisoned").push(message);
        Ok(())
    }
}

struct Failing;

#[ractor::async_trait]
impl Listener<u32> for Failing {
    async fn on_message(&self, _message: u32) -> Result<(), VaultError> {
        Err(VaultError::EventBus("listener refused".to_string()))
    }
}

struct Panicking;

#[ractor::async_trait]
impl Listener<u32> for Panicking {
    async fn on_message(&self, message: u32) -> Result<(), VaultError> {
        if message % 2 == 0 {
            panic!("listener blew up on {message}");
        }
        Ok(())
    }
}

/// Completes only if another listener reaches the barrier for the same message.
struct Rendezvous {
    barrier: Arc<Barrier>,
    done: Mutex<u32>,
}

#[ractor::async_trait]
impl Listener<u32> for Rendezvous {
    async fn on_message(&self, _message: u32) -> Result<(), VaultError> {
        self.barrier.wait().await;
        *self.done.lock().expect("poisoned") += 1;
        Ok(())
    }
}

#[tokio::test]
async fn delivers_in_publish_order() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    let recorder = Arc::new(Recorder::default());
    bus.subscribe(recorder.clone()).await.expect("subscribe");

    for i in 0..50 {
        bus.send(i).expect("send");
    }
    bus.flush().await.expect("flush");

    assert_eq!(recorder.seen(), (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn every_listener_receives_every_message() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    bus.subscribe(first.clone()).await.expect("subscribe");
    bus.subscribe(second.clone()).await.expect("subscribe");
    assert_eq!(bus.listener_count().await.expect("count"), 2);

    for i in [7, 8, 9] {
        bus.send(i).expect("send");
    }
    bus.flush().await.expect("flush");

    assert_eq!(first.seen(), [7, 8, 9]);
    assert_eq!(second.seen(), [7, 8, 9]);
}

#[tokio::test]
async fn failing_and_panicking_listeners_do_not_stop_delivery() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    bus.subscribe(Arc::new(Failing)).await.expect("subscribe");
    bus.subscribe(Arc::new(Panicking)).await.expect("subscribe");
    let recorder = Arc::new(Recorder::default());
    bus.subscribe(recorder.clone()).await.expect("subscribe");

    for i in 0..6 {
        bus.send(i).expect("send");
    }
    bus.flush().await.expect("flush");

    assert_eq!(recorder.seen(), (0..6).collect::<Vec<_>>());
    assert_eq!(bus.listener_count().await.expect("count"), 3);
}

#[tokio::test]
async fn unsubscribed_listener_stops_receiving() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    let recorder = Arc::new(Recorder::default());
    let id = bus.subscribe(recorder.clone()).await.expect("subscribe");

    bus.send(1).expect("send");
    bus.unsubscribe(id).expect("unsubscribe");
    bus.send(2).expect("send");
    bus.flush().await.expect("flush");

    assert_eq!(recorder.seen(), [1]);
    assert_eq!(bus.listener_count().await.expect("count"), 0);
    // unknown ids are ignored
    bus.unsubscribe(id).expect("unsubscribe again");
}

#[tokio::test]
async fn subscription_ids_are_distinct() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    let a = bus.subscribe(Arc::new(Failing)).await.expect("subscribe");
    let b = bus.subscribe(Arc::new(Failing)).await.expect("subscribe");
    assert_ne!(a, b);
}

#[tokio::test]
async fn listeners_of_one_message_run_concurrently() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    let barrier = Arc::new(Barrier::new(2));
    let left = Arc::new(Rendezvous {
        barrier: barrier.clone(),
        done: Mutex::new(0),
    });
    let right = Arc::new(Rendezvous {
        barrier,
        done: Mutex::new(0),
    });
    bus.subscribe(left.clone()).await.expect("subscribe");
    bus.subscribe(right.clone()).await.expect("subscribe");

    bus.send(1).expect("send");
    tokio::time::timeout(Duration::from_secs(5), bus.flush())
        .await
        .expect("listeners were run one after another")
        .expect("flush");

    assert_eq!(*left.done.lock().expect("poisoned"), 1);
    assert_eq!(*right.done.lock().expect("poisoned"), 1);
}

#[tokio::test]
async fn publishing_without_listeners_is_fine() {
    let bus = event_bus::spawn::<u32>().await.expect("spawn bus");
    bus.send(42).expect("send");
    bus.flush().await.expect("flush");
    assert_eq!(bus.listener_count().await.expect("count"), 0);
}
