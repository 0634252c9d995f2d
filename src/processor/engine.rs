//! Processor - central coordination for keyed queue dispatch
//!
//! The processor owns the queue registry, the consumer registry, and the
//! worker pool. Producers and consumers rendezvous on a key: the queue for a
//! key is created on its first enqueue or subscribe, whichever comes first.
//!
//! # Locking
//!
//! Lifecycle operations (start, stop, subscribe, unsubscribe) serialize on
//! one lifecycle mutex. Producers never touch it: `enqueue` and `dequeue` go
//! through the internally synchronized registry straight to the per-queue
//! lock, so a start/stop cycle cannot stall publishing. Worker tasks never
//! take the lifecycle lock either; queue locks are leaf locks.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::map::ShardedMap;
use crate::processor::chunks::split_round_robin;
use crate::processor::config::ProcessorConfig;
use crate::processor::consumer::Consumer;
use crate::processor::error::ConfigResult;
use crate::queue::BoundedQueue;
use crate::sched::{yield_now, LocalExecutor, WorkerPool};

/// State reachable without the lifecycle lock.
///
/// Producers, worker tasks and lifecycle operations all hold a handle to
/// this; the registry and the running flag are internally synchronized.
struct Shared<K, V> {
    queues: ShardedMap<K, Arc<BoundedQueue<V>>>,
    running: AtomicBool,
    queue_capacity: usize,
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Obtain the queue for `key`, creating it on first use.
    fn queue_for(&self, key: K) -> Arc<BoundedQueue<V>> {
        let capacity = self.queue_capacity;
        let (queue, _) = self
            .queues
            .get_or_insert_with(key, || Arc::new(BoundedQueue::new(capacity)));
        queue
    }
}

/// Registry state guarded by the lifecycle lock.
struct Lifecycle<K, V> {
    consumers: HashMap<K, Arc<dyn Consumer<K, V>>>,
    pool: Option<WorkerPool>,
}

/// One consumer's delivery context, resolved at start time.
struct Assignment<K, V> {
    key: K,
    consumer: Arc<dyn Consumer<K, V>>,
    queue: Arc<BoundedQueue<V>>,
}

/// Keyed multi-queue broker driving consumers over a worker pool.
///
/// Producers push values into named bounded queues with [`Processor::enqueue`];
/// each queue may be bound to at most one consumer with
/// [`Processor::subscribe`]. While running, the processor partitions the
/// subscribed consumers over its worker threads and runs each consumer loop
/// as a cooperative task that drains its queue.
///
/// All operational failures are soft signals: a full queue, a missing key
/// and a duplicate subscription are reported through return values, never
/// through panics or errors.
///
/// # Example
///
/// ```
/// use qmux::processor::{FnConsumer, Processor};
/// use std::sync::{Arc, Mutex};
///
/// let processor: Processor<String, u32> = Processor::with_threads(2);
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let consumer = {
///     let seen = Arc::clone(&seen);
///     FnConsumer::new(move |_key: &String, value: u32| {
///         seen.lock().unwrap().push(value);
///     })
/// };
///
/// assert!(processor.enqueue("sensor".to_string(), 7));
/// assert!(processor.subscribe("sensor".to_string(), Arc::new(consumer)));
/// processor.start();
///
/// while seen.lock().unwrap().is_empty() {
///     std::thread::yield_now();
/// }
/// processor.stop();
///
/// assert_eq!(*seen.lock().unwrap(), vec![7]);
/// ```
pub struct Processor<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    shared: Arc<Shared<K, V>>,
    lifecycle: Mutex<Lifecycle<K, V>>,
    max_threads: usize,
}

impl<K, V> Processor<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Create a processor with the default configuration.
    pub fn new() -> Self {
        Self::build(ProcessorConfig::default())
    }

    /// Create a processor with an explicit worker-thread bound.
    ///
    /// A `worker_threads` of zero selects the number of concurrent threads
    /// supported by the platform.
    pub fn with_threads(worker_threads: usize) -> Self {
        Self::build(ProcessorConfig {
            worker_threads,
            ..ProcessorConfig::default()
        })
    }

    /// Create a processor from a full configuration, validating it first.
    pub fn with_config(config: ProcessorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ProcessorConfig) -> Self {
        let max_threads = if config.worker_threads > 0 {
            config.worker_threads
        } else {
            thread::available_parallelism().map_or(1, usize::from)
        };

        Self {
            shared: Arc::new(Shared {
                queues: ShardedMap::new(config.bucket_count),
                running: AtomicBool::new(false),
                queue_capacity: config.queue_capacity,
            }),
            lifecycle: Mutex::new(Lifecycle {
                consumers: HashMap::new(),
                pool: None,
            }),
            max_threads,
        }
    }

    /// Push `value` into the queue for `key`, creating the queue on first
    /// use.
    ///
    /// Returns `false` when that queue is full. Never blocks and never takes
    /// the lifecycle lock, so producers are not serialized against
    /// start/stop.
    pub fn enqueue(&self, key: K, value: V) -> bool {
        self.shared.queue_for(key).enqueue(value)
    }

    /// Pop the head value of the queue for `key`.
    ///
    /// Returns `None` when no queue exists for `key` or the queue is empty.
    /// Never blocks and never takes the lifecycle lock.
    pub fn dequeue(&self, key: &K) -> Option<V> {
        self.shared.queues.find(key).and_then(|queue| queue.dequeue())
    }

    /// Bind `consumer` to the queue for `key`.
    ///
    /// Only one consumer can be bound per key: returns `false` if `key`
    /// already has a subscriber. On success the queue for `key` exists and
    /// is in waiting mode, so its consumer task blocks on emptiness instead
    /// of spinning. If the processor is running, it is restarted so the new
    /// consumer is included in the worker partition.
    pub fn subscribe(&self, key: K, consumer: Arc<dyn Consumer<K, V>>) -> bool {
        let mut lifecycle = self.lifecycle.lock();

        if lifecycle.consumers.contains_key(&key) {
            return false;
        }

        let was_running = self.shared.running.load(Ordering::Acquire);
        if was_running {
            self.stop_locked(&mut lifecycle);
        }

        lifecycle.consumers.insert(key.clone(), consumer);
        self.shared.queue_for(key).enable_waiting();

        if was_running {
            self.start_locked(&mut lifecycle);
        }

        log::debug!("consumer subscribed ({} total)", lifecycle.consumers.len());

        true
    }

    /// Remove the consumer bound to `key`.
    ///
    /// Returns `true` iff a subscription was removed. The queue for `key`
    /// survives: it keeps its buffered values and accepts further enqueues,
    /// but nothing drains it until a new consumer subscribes. If the
    /// processor is running, it is restarted with the remaining consumers.
    pub fn unsubscribe(&self, key: &K) -> bool {
        let mut lifecycle = self.lifecycle.lock();

        let was_running = self.shared.running.load(Ordering::Acquire);
        if was_running {
            self.stop_locked(&mut lifecycle);
        }

        let removed = lifecycle.consumers.remove(key).is_some();

        if removed {
            // The orphaned queue must not block anyone again until it has a
            // consumer; dequeue stays available meanwhile.
            if let Some(queue) = self.shared.queues.find(key) {
                queue.disable_waiting();
            }

            log::debug!(
                "consumer unsubscribed ({} remaining)",
                lifecycle.consumers.len()
            );
        }

        if was_running {
            self.start_locked(&mut lifecycle);
        }

        removed
    }

    /// Start delivery. A no-op if the processor is already running.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.start_locked(&mut lifecycle);
    }

    /// Stop delivery and tear down the worker pool.
    ///
    /// Blocked consumer tasks are released, finish their current drain
    /// cycle, and exit; values enqueued afterwards stay in their queues. A
    /// no-op if the processor is idle.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.stop_locked(&mut lifecycle);
    }

    /// Whether the worker pool is currently alive.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of keys with a bound consumer.
    pub fn subscriber_count(&self) -> usize {
        self.lifecycle.lock().consumers.len()
    }

    fn start_locked(&self, lifecycle: &mut Lifecycle<K, V>) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let thread_count = self.max_threads.min(lifecycle.consumers.len().max(1));

        // Restart cycles must restore blocking semantics: every subscribed
        // queue goes back to waiting mode before its task is spawned.
        let mut assignments = Vec::with_capacity(lifecycle.consumers.len());
        for (key, consumer) in &lifecycle.consumers {
            let queue = self.shared.queue_for(key.clone());
            queue.enable_waiting();
            assignments.push(Assignment {
                key: key.clone(),
                consumer: Arc::clone(consumer),
                queue,
            });
        }

        let consumer_count = assignments.len();
        let pool = WorkerPool::new(thread_count);

        for chunk in split_round_robin(assignments, thread_count) {
            if chunk.is_empty() {
                continue;
            }

            let shared = Arc::clone(&self.shared);
            pool.post(move || run_consumers(shared, chunk));
        }

        lifecycle.pool = Some(pool);

        log::debug!(
            "processor started: {thread_count} worker threads, {consumer_count} consumers"
        );
    }

    fn stop_locked(&self, lifecycle: &mut Lifecycle<K, V>) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }

        // Stop-signal fan-out: release every consumer task blocked on an
        // empty queue so the pool can drain.
        for key in lifecycle.consumers.keys() {
            if let Some(queue) = self.shared.queues.find(key) {
                queue.disable_waiting();
            }
        }

        if let Some(pool) = lifecycle.pool.take() {
            pool.wait();
        }

        log::debug!("processor stopped");
    }
}

impl<K, V> Default for Processor<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for Processor<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker-pool job: run one chunk of consumers as cooperative tasks.
///
/// Each task loops while the processor is running: yield to rotate across
/// the chunk, then drain the task's queue. The cooperative consume flavor is
/// essential here; parking the OS thread would starve the sibling tasks.
fn run_consumers<K, V>(shared: Arc<Shared<K, V>>, chunk: Vec<Assignment<K, V>>)
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    let mut executor = LocalExecutor::new();

    for assignment in chunk {
        let shared = Arc::clone(&shared);

        executor.spawn(async move {
            let Assignment {
                key,
                consumer,
                queue,
            } = assignment;

            while shared.running.load(Ordering::Acquire) {
                yield_now().await;
                queue
                    .consume_all_async(|value| deliver(consumer.as_ref(), &key, value))
                    .await;
            }
        });
    }

    executor.run();
}

/// Invoke the consumer callback, isolating panics at the task boundary.
///
/// A panicking consumer drops the value being delivered; the loop, the
/// sibling tasks and the worker thread all continue.
fn deliver<K, V>(consumer: &dyn Consumer<K, V>, key: &K, value: V) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| consumer.consume(key, value)));

    if outcome.is_err() {
        log::warn!("consumer callback panicked; continuing with the next value");
    }
}
