//! Test modules for the processor
//!
//! Tests are organized by functional area: plain keyed enqueue/dequeue,
//! concurrent producer/consumer delivery, lifecycle transitions, and edge
//! cases around panics and orphaned queues.

mod concurrent;
mod edge_cases;
