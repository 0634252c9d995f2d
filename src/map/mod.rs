//! Sharded Concurrent Map Component
//!
//! A thread-safe mapping from key to shared value, organized as a fixed
//! number of independently locked buckets. The broker uses it as the queue
//! registry: producers and consumers rendezvous on a key without ever
//! serializing against lifecycle operations, and contention is limited to
//! keys that hash into the same bucket.
//!
//! The bucket count is fixed at construction. The map hands out clones of
//! its values, so it is meant to hold cheap shared handles (`Arc`s) rather
//! than large payloads, and it never resizes or rehashes.

mod sharded;

pub use sharded::ShardedMap;
