//! Shared translation cache.
//!
//! Lookups take the read lock and never reorder entries; inserts, merges and
//! clears take the write lock. Eviction is strictly by insertion order, one
//! entry at a time.

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::cache::{BoundedCache, EvictionPolicy};

#[derive(Debug)]
pub struct TranslationCache {
    inner: RwLock<BoundedCache<String, String>>,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BoundedCache::new(
                capacity,
                EvictionPolicy::InsertionOrder { batch: 1 },
            )),
        }
    }

    pub fn get(&self, text: &str) -> Option<String> {
        self.inner.read().peek(text).cloned()
    }

    /// Insert or overwrite; returns the number of evicted entries.
    pub fn insert(&self, text: String, translation: String) -> usize {
        self.inner.write().insert(text, translation)
    }

    /// Add entries whose keys are not cached yet, in iteration order.
    /// Returns how many were added.
    pub fn merge(&self, entries: IndexMap<String, String>) -> usize {
        let mut cache = self.inner.write();
        let mut added = 0;
        for (text, translation) in entries {
            if !cache.contains_key(&text) {
                cache.insert(text, translation);
                added += 1;
            }
        }
        added
    }

    /// Copy of the whole mapping, oldest entry first.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.inner.read().entries().into_iter().collect()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_two_evicts_oldest() {
        let cache = TranslationCache::new(2);
        cache.insert("a".into(), "A".into());
        cache.insert("b".into(), "B".into());
        assert_eq!(cache.insert("c".into(), "C".into()), 1);

        assert_eq!(cache.len(), 2);
        let evicted = ["a", "b"].iter().filter(|k| cache.get(k).is_none()).count();
        assert_eq!(evicted, 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c").as_deref(), Some("C"));
    }

    #[test]
    fn test_merge_keeps_present_keys() {
        let cache = TranslationCache::new(10);
        cache.insert("你好".into(), "Hi".into());

        let mut loaded = IndexMap::new();
        loaded.insert("你好".to_string(), "Hello".to_string());
        loaded.insert("谢谢".to_string(), "Thanks".to_string());

        assert_eq!(cache.merge(loaded), 1);
        assert_eq!(cache.get("你好").as_deref(), Some("Hi"));
        assert_eq!(cache.get("谢谢").as_deref(), Some("Thanks"));
    }

    #[test]
    fn test_merge_respects_capacity() {
        let cache = TranslationCache::new(3);
        let loaded: IndexMap<String, String> =
            (0..10).map(|i| (format!("k{}", i), format!("v{}", i))).collect();
        cache.merge(loaded);
        assert_eq!(cache.len(), 3);
        assert!(cache.get("k9").is_some());
        assert!(cache.get("k0").is_none());
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let cache = TranslationCache::new(5);
        for k in ["x", "y", "z"] {
            cache.insert(k.into(), k.to_uppercase());
        }
        let keys: Vec<_> = cache.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_clear() {
        let cache = TranslationCache::new(5);
        cache.insert("a".into(), "A".into());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 5);
    }
}
