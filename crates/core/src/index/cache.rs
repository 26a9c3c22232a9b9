//! Insertion-ordered cache whose bound is decided by an eviction policy.

use indexmap::IndexMap;
use std::hash::Hash;

/// Decides how many entries a [`BoundedCache`] may hold and whether reads
/// count as use.
pub trait EvictionPolicy {
    /// `None` means unbounded.
    fn capacity(&self) -> Option<usize>;

    /// Whether a hit moves the entry to the most recently used end.
    fn refresh_on_hit(&self) -> bool;
}

/// Least recently used eviction with a fixed capacity (at least one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lru {
    capacity: usize,
}

impl Lru {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl EvictionPolicy for Lru {
    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }

    fn refresh_on_hit(&self) -> bool {
        true
    }
}

/// Entries are kept oldest first; eviction always removes the front.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V, P = Lru> {
    entries: IndexMap<K, V>,
    policy: P,
}

impl<K: Hash + Eq, V, P: EvictionPolicy> BoundedCache<K, V, P> {
    pub fn new(policy: P) -> Self {
        Self {
            entries: IndexMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.policy.refresh_on_hit() {
            let (k, v) = self.entries.shift_remove_entry(key)?;
            self.entries.insert(k, v);
        }
        self.entries.get(key)
    }

    /// Lookup without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces `key` as the most recent entry and returns the
    /// entries evicted to stay within capacity.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);

        let mut evicted = Vec::new();
        if let Some(capacity) = self.policy.capacity() {
            while self.entries.len() > capacity {
                match self.entries.shift_remove_index(0) {
                    Some(entry) => evicted.push(entry),
                    None => break,
                }
            }
        }
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<P: EvictionPolicy>(cache: &BoundedCache<u32, &'static str, P>) -> Vec<u32> {
        cache.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        let mut cache = BoundedCache::new(Lru::new(2));
        assert!(cache.insert(1, "a").is_empty());
        assert!(cache.insert(2, "b").is_empty());
        assert_eq!(cache.get(&1), Some(&"a"));

        let evicted = cache.insert(3, "c");
        assert_eq!(evicted, vec![(2, "b")]);
        assert_eq!(keys(&cache), vec![1, 3]);
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let mut cache = BoundedCache::new(Lru::new(2));
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.peek(&1), Some(&"a"));
        cache.insert(3, "c");
        assert!(!cache.contains(&1));
    }

    #[test]
    fn test_reinsert_refreshes_and_replaces() {
        let mut cache = BoundedCache::new(Lru::new(3));
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(1, "z");
        assert_eq!(keys(&cache), vec![2, 1]);
        assert_eq!(cache.peek(&1), Some(&"z"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = BoundedCache::new(Lru::new(0));
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(keys(&cache), vec![2]);
    }
}
