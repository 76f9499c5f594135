//! Direct-mapped computed table.
//!
//! Each key hashes to exactly one slot; a colliding insert simply evicts the previous entry.
//! Lookups compare the full key, so an eviction can only cost a recomputation, never a wrong answer.

use crate::utils::MyHash;

struct Entry<K, V> {
    key: K,
    value: V,
}

pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    hits: usize,
    misses: usize,
}

impl<K, V> Cache<K, V> {
    /// Create a new cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1usize << bits;
        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask: (size - 1) as u64,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Reset the cache (statistics are kept).
    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn slot(&self, key: &K) -> usize
    where
        K: MyHash,
    {
        (key.hash() & self.bitmask) as usize
    }

    /// Get the cached result.
    pub fn get(&mut self, key: &K) -> Option<&V>
    where
        K: MyHash + Eq,
    {
        let slot = self.slot(key);
        match &self.data[slot] {
            Some(entry) if &entry.key == key => {
                self.hits += 1;
                Some(&entry.value)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a result into the cache.
    pub fn insert(&mut self, key: K, value: V)
    where
        K: MyHash,
    {
        let slot = self.slot(&key);
        self.data[slot] = Some(Entry { key, value });
    }
}
