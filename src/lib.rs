//! In-process keyed multi-queue broker.
//!
//! Producers push values into named bounded queues; each queue may be bound
//! to at most one consumer; a fixed-size worker pool drives delivery by
//! running every consumer loop as a cooperative task. See
//! [`processor::Processor`] for the broker surface and the component modules
//! for the building blocks.

pub mod map;
pub mod processor;
pub mod queue;
pub mod sched;
