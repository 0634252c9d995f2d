//! Consumer capability for queue subscriptions
//!
//! The broker treats a consumer as an opaque capability with a single
//! operation and never inspects its internals. A consumer bound to several
//! keys may be invoked concurrently from different worker threads, one
//! thread per key; the values of a single key are always delivered
//! sequentially, because that key's queue is drained by exactly one
//! cooperative task.

/// A receiver of values for the queues it is subscribed to.
///
/// Implementations must be thread-safe: the same consumer instance can be
/// driven from multiple worker threads when it is bound to multiple keys.
pub trait Consumer<K, V>: Send + Sync {
    /// Consume one value from the queue identified by `key`.
    fn consume(&self, key: &K, value: V);
}

/// Function-object adapter implementing [`Consumer`] for any callable.
///
/// # Example
///
/// ```
/// use qmux::processor::{Consumer, FnConsumer};
///
/// let printer = FnConsumer::new(|key: &String, value: u32| {
///     println!("{key}: {value}");
/// });
/// printer.consume(&"metrics".to_string(), 42);
/// ```
pub struct FnConsumer<F> {
    callable: F,
}

impl<F> FnConsumer<F> {
    pub fn new(callable: F) -> Self {
        Self { callable }
    }
}

impl<K, V, F> Consumer<K, V> for FnConsumer<F>
where
    F: Fn(&K, V) + Send + Sync,
{
    fn consume(&self, key: &K, value: V) {
        (self.callable)(key, value);
    }
}
