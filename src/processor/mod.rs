//! Keyed Multi-Queue Dispatch Component
//!
//! The processor is the broker's public surface: producers push values into
//! named bounded queues, each queue may be bound to at most one consumer,
//! and a fixed-size worker pool drives delivery by running every consumer
//! loop as a cooperative task.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Producer A  │   │  Producer B  │   │  Producer C  │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │ enqueue(k, v)    │                  │
//!        ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ Processor                                           │
//! │   queue registry (sharded, lock per bucket)         │
//! │   ┌─────────┐  ┌─────────┐  ┌─────────┐             │
//! │   │ queue k1│  │ queue k2│  │ queue k3│  ...        │
//! │   └────┬────┘  └────┬────┘  └────┬────┘             │
//! │        │            │            │    drain          │
//! │   ┌────┴────────────┴───┐  ┌─────┴──────────┐       │
//! │   │ worker thread 0     │  │ worker thread 1 │      │
//! │   │  task k1 ⇄ task k2  │  │  task k3        │      │
//! │   └─────────────────────┘  └────────────────┘       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Consumers are partitioned over the worker threads in balanced chunks on
//! `start`; within one thread the tasks interleave at explicit yield points,
//! so a busy queue cannot starve its neighbors.
//!
//! # Example
//!
//! ```
//! use qmux::processor::{FnConsumer, Processor};
//! use std::sync::Arc;
//!
//! let processor: Processor<String, String> = Processor::new();
//!
//! // Queues are created on demand; no subscriber is required to use the
//! // broker as plain keyed storage.
//! assert!(processor.enqueue("logs".to_string(), "line 1".to_string()));
//! assert_eq!(processor.dequeue(&"logs".to_string()).as_deref(), Some("line 1"));
//!
//! // Delivery mode: bind a consumer, then start the worker pool.
//! let consumer = FnConsumer::new(|key: &String, value: String| {
//!     println!("{key}: {value}");
//! });
//! assert!(processor.subscribe("logs".to_string(), Arc::new(consumer)));
//! processor.start();
//! processor.stop();
//! ```

mod chunks;
mod config;
mod consumer;
mod engine;
mod error;

pub use config::{ProcessorConfig, DEFAULT_QUEUE_CAPACITY};
pub use consumer::{Consumer, FnConsumer};
pub use engine::Processor;
pub use error::{ConfigError, ConfigResult};

#[cfg(test)]
mod tests;
