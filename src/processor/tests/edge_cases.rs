//! Tests for degenerate inputs and failure isolation

use crate::processor::{FnConsumer, Processor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn wait_for<F>(predicate: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn start_with_no_consumers_is_harmless() {
    let processor: Processor<u32, u32> = Processor::with_threads(4);

    processor.start();
    assert!(processor.is_running());

    assert!(processor.enqueue(1, 10));
    assert_eq!(processor.dequeue(&1), Some(10));

    processor.stop();
}

#[test]
fn panicking_consumer_does_not_take_down_delivery() {
    let processor: Processor<u32, u32> = Processor::with_threads(1);
    let delivered = Arc::new(AtomicUsize::new(0));

    let consumer = {
        let delivered = Arc::clone(&delivered);
        Arc::new(FnConsumer::new(move |_key: &u32, value: u32| {
            if value == 13 {
                panic!("unlucky value");
            }
            delivered.fetch_add(1, Ordering::SeqCst);
        }))
    };

    assert!(processor.subscribe(0, consumer));
    processor.start();

    for value in [1, 13, 2, 3] {
        assert!(processor.enqueue(0, value));
    }

    assert!(
        wait_for(|| delivered.load(Ordering::SeqCst) == 3),
        "values after the panicking one must still be delivered"
    );

    processor.stop();
}

#[test]
fn values_survive_with_no_subscriber_until_dequeued() {
    let processor: Processor<String, u32> = Processor::new();

    assert!(processor.enqueue("parked".to_string(), 1));
    assert!(processor.enqueue("parked".to_string(), 2));

    processor.start();
    processor.stop();

    assert_eq!(processor.dequeue(&"parked".to_string()), Some(1));
    assert_eq!(processor.dequeue(&"parked".to_string()), Some(2));
    assert_eq!(processor.dequeue(&"parked".to_string()), None);
}

#[test]
fn orphaned_queue_keeps_accepting_values() {
    let processor: Processor<String, u32> = Processor::new();
    let sink = Arc::new(Mutex::new(Vec::new()));

    let consumer = {
        let sink = Arc::clone(&sink);
        Arc::new(FnConsumer::new(move |_key: &String, value: u32| {
            sink.lock().unwrap().push(value);
        }))
    };

    assert!(processor.subscribe("queue".to_string(), consumer));
    assert!(processor.unsubscribe(&"queue".to_string()));

    // No consumer anymore, but the queue itself survives.
    assert!(processor.enqueue("queue".to_string(), 7));
    assert_eq!(processor.dequeue(&"queue".to_string()), Some(7));
    assert!(sink.lock().unwrap().is_empty());
}

#[test]
fn subscribing_more_consumers_than_worker_threads_still_drains_all() {
    const KEYS: usize = 12;

    let processor: Arc<Processor<usize, usize>> = Arc::new(Processor::with_threads(3));
    let counts = Arc::new(AtomicUsize::new(0));

    for key in 0..KEYS {
        let counts = Arc::clone(&counts);
        let consumer = FnConsumer::new(move |_key: &usize, _value: usize| {
            counts.fetch_add(1, Ordering::SeqCst);
        });
        assert!(processor.subscribe(key, Arc::new(consumer)));
    }

    for key in 0..KEYS {
        assert!(processor.enqueue(key, key));
    }

    processor.start();

    assert!(
        wait_for(|| counts.load(Ordering::SeqCst) == KEYS),
        "each of the {KEYS} queues must deliver its value"
    );

    processor.stop();
}
