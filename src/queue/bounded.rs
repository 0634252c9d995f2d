//! Fixed-capacity FIFO with blocking and cooperative consume paths
//!
//! The buffer, the waiting flag and the registered task wakers live behind a
//! single mutex. OS-thread consumers park on the condition variable;
//! cooperative consumers register their `Waker` and suspend. Producers never
//! block: a full queue is reported through the `enqueue` return value.

use std::collections::VecDeque;
use std::future::poll_fn;
use std::task::{Poll, Waker};

use parking_lot::{Condvar, Mutex};

/// Buffer state guarded by the queue mutex.
struct QueueState<V> {
    buffer: VecDeque<V>,
    /// While set, consume operations block on emptiness instead of returning.
    waiting: bool,
    /// Wakers of cooperative tasks suspended in a consume operation.
    wakers: Vec<Waker>,
}

impl<V> QueueState<V> {
    fn register(&mut self, waker: &Waker) {
        if !self.wakers.iter().any(|known| known.will_wake(waker)) {
            self.wakers.push(waker.clone());
        }
    }

    fn wake_one(&mut self) {
        if let Some(waker) = self.wakers.pop() {
            waker.wake();
        }
    }

    fn wake_all(&mut self) {
        for waker in self.wakers.drain(..) {
            waker.wake();
        }
    }
}

/// Bounded FIFO queue for a single value type.
///
/// The capacity is fixed at construction. Enqueueing into a full queue fails
/// cleanly; retrying or dropping is the producer's decision. Consume
/// operations come in a blocking flavor for dedicated threads and a
/// cooperative flavor for tasks multiplexed on a worker thread, with
/// identical semantics.
///
/// # Waiting mode
///
/// With waiting mode off (the default), consume operations return
/// immediately on an empty queue. [`BoundedQueue::enable_waiting`] switches
/// consumers to blocking on emptiness; [`BoundedQueue::disable_waiting`]
/// switches back and releases every blocked consumer so it can observe the
/// change.
///
/// # Example
///
/// ```
/// use qmux::queue::BoundedQueue;
///
/// let queue = BoundedQueue::new(2);
/// assert!(queue.enqueue("a"));
/// assert!(queue.enqueue("b"));
/// assert!(!queue.enqueue("c")); // full
/// assert_eq!(queue.dequeue(), Some("a"));
/// ```
pub struct BoundedQueue<V> {
    capacity: usize,
    state: Mutex<QueueState<V>>,
    data_ready: Condvar,
}

impl<V> BoundedQueue<V> {
    /// Create a queue holding at most `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");

        Self {
            capacity,
            state: Mutex::new(QueueState {
                buffer: VecDeque::with_capacity(capacity),
                waiting: false,
                wakers: Vec::new(),
            }),
            data_ready: Condvar::new(),
        }
    }

    /// Push a value at the tail of the queue.
    ///
    /// Returns `false` without blocking when the queue is full. On a
    /// successful push while waiting mode is on, one blocked consumer is
    /// woken.
    pub fn enqueue(&self, value: V) -> bool {
        let mut state = self.state.lock();

        if state.buffer.len() == self.capacity {
            return false;
        }

        state.buffer.push_back(value);

        if state.waiting {
            self.data_ready.notify_one();
            state.wake_one();
        }

        true
    }

    /// Pop the head value, or `None` when the queue is empty.
    ///
    /// Never blocks, regardless of waiting mode.
    pub fn dequeue(&self) -> Option<V> {
        self.state.lock().buffer.pop_front()
    }

    /// Consume one value, parking the calling thread while the queue is
    /// empty and waiting mode is on.
    ///
    /// The callback runs outside the queue lock. Returns `true` iff a value
    /// was dequeued and handed to the callback.
    pub fn consume_one<F>(&self, callback: F) -> bool
    where
        F: FnOnce(V),
    {
        let dequeued = {
            let mut state = self.state.lock();

            while state.waiting && state.buffer.is_empty() {
                self.data_ready.wait(&mut state);
            }

            state.buffer.pop_front()
        };

        match dequeued {
            Some(value) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    /// Consume every value currently in the queue, parking the calling
    /// thread while the queue is empty and waiting mode is on.
    ///
    /// The snapshot is taken atomically under the lock; the callback then
    /// runs outside the lock, once per value in FIFO order. Values enqueued
    /// after the snapshot belong to the next drain cycle. Returns the number
    /// of values consumed.
    pub fn consume_all<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(V),
    {
        let drained = {
            let mut state = self.state.lock();

            while state.waiting && state.buffer.is_empty() {
                self.data_ready.wait(&mut state);
            }

            state.buffer.drain(..).collect::<Vec<_>>()
        };

        let count = drained.len();

        for value in drained {
            callback(value);
        }

        count
    }

    /// Cooperative flavor of [`BoundedQueue::consume_one`].
    ///
    /// Suspends the calling task instead of parking the thread, so sibling
    /// tasks on the same worker keep running.
    pub async fn consume_one_async<F>(&self, callback: F) -> bool
    where
        F: FnOnce(V),
    {
        let dequeued = poll_fn(|cx| {
            let mut state = self.state.lock();

            if state.waiting && state.buffer.is_empty() {
                state.register(cx.waker());
                return Poll::Pending;
            }

            Poll::Ready(state.buffer.pop_front())
        })
        .await;

        match dequeued {
            Some(value) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    /// Cooperative flavor of [`BoundedQueue::consume_all`].
    ///
    /// Suspends the calling task instead of parking the thread. The snapshot
    /// contract is identical: taken under the lock, drained in FIFO order,
    /// callback invoked outside the lock.
    pub async fn consume_all_async<F>(&self, mut callback: F) -> usize
    where
        F: FnMut(V),
    {
        let drained = poll_fn(|cx| {
            let mut state = self.state.lock();

            if state.waiting && state.buffer.is_empty() {
                state.register(cx.waker());
                return Poll::Pending;
            }

            Poll::Ready(state.buffer.drain(..).collect::<Vec<_>>())
        })
        .await;

        let count = drained.len();

        for value in drained {
            callback(value);
        }

        count
    }

    /// Make consume operations block on emptiness.
    pub fn enable_waiting(&self) {
        self.state.lock().waiting = true;
    }

    /// Make consume operations return immediately on emptiness.
    ///
    /// Every consumer currently blocked in a consume operation is released,
    /// of both flavors, so it can observe the change and return.
    pub fn disable_waiting(&self) {
        let mut state = self.state.lock();
        state.waiting = false;
        self.data_ready.notify_all();
        state.wake_all();
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }

    /// The fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
