//! Bounded key/value cache shared by the candidate resolver and the
//! translation pipeline.
//!
//! Two eviction policies are available:
//!
//! - `InsertionOrder { batch }`: when a new key arrives at capacity, the first
//!   `batch` entries in iteration order are dropped before the insert. Backed
//!   by an `IndexMap`, so iteration order is insertion order and the eviction
//!   victims are deterministic. Reads never reorder entries.
//! - `LeastRecentlyUsed`: classic LRU backed by `lru::LruCache`; `get`
//!   promotes the entry, `peek` does not.
//!
//! Whatever the policy, `len() <= capacity()` holds after every insert.

use indexmap::IndexMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// How a full cache makes room for a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Drop the oldest `batch` entries (at least one) by insertion order.
    InsertionOrder { batch: usize },
    /// Drop the least recently read or written entry.
    LeastRecentlyUsed,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::InsertionOrder { batch: 1 }
    }
}

#[derive(Debug)]
enum Storage<K: Hash + Eq, V> {
    Ordered { map: IndexMap<K, V>, batch: usize },
    Lru(LruCache<K, V>),
}

/// A capacity-bounded map with a configurable eviction policy.
#[derive(Debug)]
pub struct BoundedCache<K: Hash + Eq, V> {
    storage: Storage<K, V>,
    capacity: usize,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries (clamped to 1).
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        let storage = match policy {
            EvictionPolicy::InsertionOrder { batch } => Storage::Ordered {
                map: IndexMap::with_capacity(capacity),
                batch: batch.max(1),
            },
            EvictionPolicy::LeastRecentlyUsed => {
                Storage::Lru(LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)))
            }
        };
        Self { storage, capacity }
    }

    /// The policy this cache was built with.
    pub fn policy(&self) -> EvictionPolicy {
        match &self.storage {
            Storage::Ordered { batch, .. } => EvictionPolicy::InsertionOrder { batch: *batch },
            Storage::Lru(_) => EvictionPolicy::LeastRecentlyUsed,
        }
    }

    /// Look up a value; under LRU this marks the entry as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &mut self.storage {
            Storage::Ordered { map, .. } => map.get(key),
            Storage::Lru(lru) => lru.get(key),
        }
    }

    /// Look up a value without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &self.storage {
            Storage::Ordered { map, .. } => map.get(key),
            Storage::Lru(lru) => lru.peek(key),
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &self.storage {
            Storage::Ordered { map, .. } => map.contains_key(key),
            Storage::Lru(lru) => lru.contains(key),
        }
    }

    /// Insert or overwrite an entry, evicting first if a new key would
    /// overflow the cache. Returns the number of evicted entries.
    ///
    /// Overwriting an existing key never evicts.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        let capacity = self.capacity;
        match &mut self.storage {
            Storage::Ordered { map, batch } => {
                if let Some(slot) = map.get_mut(&key) {
                    *slot = value;
                    return 0;
                }
                let mut evicted = 0;
                if map.len() >= capacity {
                    let n = (*batch).min(map.len());
                    evicted = map.drain(..n).count();
                }
                map.insert(key, value);
                evicted
            }
            Storage::Lru(lru) => {
                let is_new = !lru.contains(&key);
                let full = lru.len() >= capacity;
                lru.put(key, value);
                usize::from(is_new && full)
            }
        }
    }

    /// Remove an entry, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match &mut self.storage {
            Storage::Ordered { map, .. } => map.shift_remove(key),
            Storage::Lru(lru) => lru.pop(key),
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Ordered { map, .. } => map.len(),
            Storage::Lru(lru) => lru.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        match &mut self.storage {
            Storage::Ordered { map, .. } => map.clear(),
            Storage::Lru(lru) => lru.clear(),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    /// Clone all entries out, next eviction victim first.
    pub fn entries(&self) -> Vec<(K, V)> {
        match &self.storage {
            Storage::Ordered { map, .. } => {
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            // LruCache iterates most recent first.
            Storage::Lru(lru) => lru
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
