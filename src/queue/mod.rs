//! Bounded Per-Key Queue Component
//!
//! A fixed-capacity FIFO buffer with synchronized enqueue/dequeue, bulk
//! drain, and an externally toggled "wait for data" mode. One queue carries
//! the values of one key inside the broker; producers push from arbitrary
//! threads while a single consumer drains.
//!
//! Two consume flavors share the same buffer and the same semantics:
//!
//! - **Blocking**: [`BoundedQueue::consume_one`] / [`BoundedQueue::consume_all`]
//!   park the calling OS thread on a condition variable while the queue is
//!   empty and waiting mode is on.
//! - **Cooperative**: [`BoundedQueue::consume_one_async`] /
//!   [`BoundedQueue::consume_all_async`] suspend the calling task instead,
//!   yielding its worker thread to sibling tasks until a producer wakes it.
//!
//! The flavor is chosen at the call seam, so the same queue instance can be
//! drained by a dedicated OS thread or by a task multiplexed on a shared
//! worker thread.

mod bounded;

pub use bounded::BoundedQueue;
