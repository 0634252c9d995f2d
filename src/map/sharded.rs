//! Fixed-bucket sharded map guarded by per-bucket reader/writer locks

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::thread;

use parking_lot::RwLock;

/// One shard: a short association list under its own reader/writer lock.
///
/// Lookups take the shared lock; insertion and removal take the exclusive
/// lock. A bucket holds at most one entry per key.
struct Bucket<K, V> {
    entries: RwLock<Vec<(K, V)>>,
}

impl<K, V> Bucket<K, V>
where
    K: Eq,
    V: Clone,
{
    fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn find(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        entries
            .iter()
            .find(|(known, _)| known == key)
            .map(|(_, value)| value.clone())
    }

    fn get_or_insert_with<F>(&self, key: K, make_value: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        let mut entries = self.entries.write();

        if let Some((_, value)) = entries.iter().find(|(known, _)| known == &key) {
            return (value.clone(), false);
        }

        let value = make_value();
        entries.push((key, value.clone()));

        (value, true)
    }

    fn remove(&self, key: &K) {
        let mut entries = self.entries.write();
        entries.retain(|(known, _)| known != key);
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Concurrent map from key to shared value with insertion-or-get semantics.
///
/// Keys are distributed over a fixed set of buckets by `hash(key) % buckets`;
/// operations on distinct buckets never serialize. Values are cloned out on
/// every read, so `V` should be a cheap shared handle.
///
/// # Example
///
/// ```
/// use qmux::map::ShardedMap;
/// use std::sync::Arc;
///
/// let map: ShardedMap<String, Arc<Vec<u8>>> = ShardedMap::new(8);
///
/// let (first, inserted) = map.get_or_insert("alpha".to_string(), Arc::new(vec![1]));
/// assert!(inserted);
///
/// let (second, inserted) = map.get_or_insert("alpha".to_string(), Arc::new(vec![2]));
/// assert!(!inserted);
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct ShardedMap<K, V, S = RandomState> {
    buckets: Vec<Bucket<K, V>>,
    hasher: S,
}

impl<K, V> ShardedMap<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Create a map with the given number of buckets.
    ///
    /// A `bucket_count` of zero selects the number of concurrent threads
    /// supported by the platform. The count never changes afterwards.
    pub fn new(bucket_count: usize) -> Self {
        Self::with_hasher(bucket_count, RandomState::new())
    }
}

impl<K, V, S> ShardedMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    /// Create a map with the given bucket count and hasher.
    pub fn with_hasher(bucket_count: usize, hasher: S) -> Self {
        let bucket_count = if bucket_count > 0 {
            bucket_count
        } else {
            thread::available_parallelism().map_or(1, usize::from)
        };

        Self {
            buckets: (0..bucket_count).map(|_| Bucket::new()).collect(),
            hasher,
        }
    }

    /// Return the value for `key`, inserting `value` if the key is absent.
    ///
    /// Atomic within the key's bucket: the result is `(existing, false)`
    /// when the key was present and `(value, true)` when the insertion
    /// happened. The returned value is a clone of the entry in the map.
    pub fn get_or_insert(&self, key: K, value: V) -> (V, bool) {
        self.get_or_insert_with(key, move || value)
    }

    /// Like [`ShardedMap::get_or_insert`], but the value is only
    /// constructed when the key is absent.
    pub fn get_or_insert_with<F>(&self, key: K, make_value: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        self.bucket(&key).get_or_insert_with(key, make_value)
    }

    /// Look up the value for `key`, returning a clone of it.
    pub fn find(&self, key: &K) -> Option<V> {
        self.bucket(key).find(key)
    }

    /// Remove the entry for `key`, if present.
    pub fn remove(&self, key: &K) {
        self.bucket(key).remove(key);
    }

    /// Total number of entries across all buckets.
    ///
    /// Computed bucket by bucket; concurrent mutation can make the result
    /// stale by the time it is returned.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Whether the map currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets, fixed at construction.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, key: &K) -> &Bucket<K, V> {
        let index = self.hasher.hash_one(key) as usize % self.buckets.len();
        &self.buckets[index]
    }
}
