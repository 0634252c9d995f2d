//! Tests for concurrent production and delivery

use crate::processor::{FnConsumer, Processor, ProcessorConfig};
use std::collections::BTreeSet;
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
fn two_producers_one_shared_consumer() {
    let first_values = [1, 2, 3, 4, 5];
    let second_values = [42, 43];
    let expected_count = first_values.len() + second_values.len();

    let processor: Arc<Processor<i32, i32>> = Arc::new(Processor::with_threads(1));
    processor.start();

    let first_producer = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || {
            for value in first_values {
                assert!(processor.enqueue(0, value));
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let second_producer = {
        let processor = Arc::clone(&processor);
        thread::spawn(move || {
            for value in second_values {
                assert!(processor.enqueue(1, value));
            }
        })
    };

    let consumed = Arc::new(Mutex::new(BTreeSet::new()));
    let consumer = {
        let consumed = Arc::clone(&consumed);
        Arc::new(FnConsumer::new(move |_key: &i32, value: i32| {
            consumed.lock().unwrap().insert(value);
        }))
    };

    // One shared consumer bound to both keys, subscribed while the
    // processor is already running.
    assert!(processor.subscribe(0, consumer.clone()));
    assert!(processor.subscribe(1, consumer));

    first_producer.join().unwrap();
    second_producer.join().unwrap();

    assert!(
        wait_for(|| consumed.lock().unwrap().len() == expected_count),
        "expected {expected_count} values to be delivered"
    );

    processor.stop();

    let consumed = consumed.lock().unwrap();
    let expected: BTreeSet<i32> = [1, 2, 3, 4, 5, 42, 43].into_iter().collect();
    assert_eq!(*consumed, expected);
}

#[test]
fn delivery_loses_nothing_and_duplicates_nothing() {
    const KEYS: usize = 4;
    const PER_KEY: usize = 200;

    // A small queue capacity forces producers through the retry path while
    // consumers drain concurrently.
    let config = ProcessorConfig {
        worker_threads: 2,
        queue_capacity: 16,
        ..ProcessorConfig::default()
    };
    let processor: Arc<Processor<usize, usize>> = Arc::new(Processor::with_config(config).unwrap());

    let received: Arc<Vec<Mutex<Vec<usize>>>> =
        Arc::new((0..KEYS).map(|_| Mutex::new(Vec::new())).collect());

    for key in 0..KEYS {
        let received = Arc::clone(&received);
        let consumer = FnConsumer::new(move |key: &usize, value: usize| {
            received[*key].lock().unwrap().push(value);
        });
        assert!(processor.subscribe(key, Arc::new(consumer)));
    }

    processor.start();

    let producers: Vec<_> = (0..KEYS)
        .map(|key| {
            let processor = Arc::clone(&processor);
            thread::spawn(move || {
                for value in 0..PER_KEY {
                    while !processor.enqueue(key, value) {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    assert!(
        wait_for(|| (0..KEYS).all(|key| received[key].lock().unwrap().len() == PER_KEY)),
        "every key must receive its full value sequence"
    );

    processor.stop();

    // Single producer per key: delivery must also preserve order.
    let expected: Vec<usize> = (0..PER_KEY).collect();
    for key in 0..KEYS {
        assert_eq!(*received[key].lock().unwrap(), expected);
    }
}

#[test]
fn one_worker_thread_serves_many_queues() {
    const KEYS: usize = 8;

    let processor: Arc<Processor<usize, usize>> = Arc::new(Processor::with_threads(1));

    let counts: Arc<Vec<Mutex<usize>>> = Arc::new((0..KEYS).map(|_| Mutex::new(0)).collect());

    for key in 0..KEYS {
        let counts = Arc::clone(&counts);
        let consumer = FnConsumer::new(move |key: &usize, _value: usize| {
            *counts[*key].lock().unwrap() += 1;
        });
        assert!(processor.subscribe(key, Arc::new(consumer)));
    }

    processor.start();

    for key in 0..KEYS {
        for value in 0..10 {
            assert!(processor.enqueue(key, value));
        }
    }

    // Every queue must make progress despite sharing a single worker: the
    // consumer tasks rotate at their yield points.
    assert!(
        wait_for(|| (0..KEYS).all(|key| *counts[key].lock().unwrap() == 10)),
        "all queues must drain on a single worker thread"
    );

    processor.stop();
}
