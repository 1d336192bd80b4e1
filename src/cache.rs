//! A least recently used cache with a fixed capacity.

use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

/// A fixed capacity cache that evicts the least recently used entry.
///
/// Entries live in a slab and are linked into a list ordered from the most
/// recently used (head) to the least recently used (tail). A map from key to
/// slab index makes both lookups and reordering constant time.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    entries: Vec<Entry<K, V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns the value for the key, marking it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let i = *self.map.get(key)?;
        self.touch(i);
        Some(&self.entries[i].value)
    }

    /// Inserts a value, marking it as most recently used.
    ///
    /// Returns the entry that was displaced, either the previous value for
    /// the same key or the evicted least recently used entry. With a
    /// capacity of zero nothing is stored and the given entry is returned.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return Some((key, value));
        }

        if let Some(&i) = self.map.get(&key) {
            let old = mem::replace(&mut self.entries[i].value, value);
            self.touch(i);
            return Some((key, old));
        }

        if self.map.len() < self.capacity {
            let i = self.entries.len();
            self.entries.push(Entry {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.map.insert(key, i);
            self.push_front(i);
            return None;
        }

        // Reuse the slot of the least recently used entry.
        let i = self.tail?;
        self.unlink(i);
        let entry = &mut self.entries[i];
        let old_key = mem::replace(&mut entry.key, key.clone());
        let old_value = mem::replace(&mut entry.value, value);
        self.map.remove(&old_key);
        self.map.insert(key, i);
        self.push_front(i);
        Some((old_key, old_value))
    }

    fn touch(&mut self, i: usize) {
        if self.head != Some(i) {
            self.unlink(i);
            self.push_front(i);
        }
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.entries[i].prev, self.entries[i].next);
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }
        self.entries[i].prev = None;
        self.entries[i].next = None;
    }

    fn push_front(&mut self, i: usize) {
        self.entries[i].prev = None;
        self.entries[i].next = self.head;
        if let Some(h) = self.head {
            self.entries[h].prev = Some(i);
        }
        self.head = Some(i);
        if self.tail.is_none() {
            self.tail = Some(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        assert_eq!(cache.set("a", 1), None);
        assert_eq!(cache.set("b", 2), None);
        assert_eq!(cache.set("c", 3), Some(("a", 1)));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn lru_get_touches() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.set("c", 3), Some(("b", 2)));
        assert_eq!(cache.get(&"a"), Some(&1));
    }

    #[test]
    fn lru_set_existing_replaces() {
        let mut cache = LruCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.set("a", 10), Some(("a", 1)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.set("c", 3), Some(("b", 2)));
        assert_eq!(cache.get(&"a"), Some(&10));
    }

    #[test]
    fn lru_capacity_one() {
        let mut cache = LruCache::new(1);
        cache.set("a", 1);
        assert_eq!(cache.set("b", 2), Some(("a", 1)));
        assert_eq!(cache.get(&"b"), Some(&2));
    }

    #[test]
    fn lru_capacity_zero_stores_nothing() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.set("a", 1), Some(("a", 1)));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0);
    }
}
