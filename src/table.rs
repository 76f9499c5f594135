//! Hash-consing node table.
//!
//! Values are stored in an append-only vector and chained into buckets by their
//! [`MyHash`] value. Index `0` is a sentry and never holds a value, so `0` doubles
//! as the "end of chain" marker. The bucket array doubles whenever the average
//! chain length exceeds two.

use std::ops::Index;

use crate::utils::MyHash;

pub struct Table<T> {
    values: Vec<T>,
    next: Vec<u32>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let size = 1usize << bits;
        Self {
            values: vec![T::default()],
            next: vec![0],
            buckets: vec![0; size],
            bitmask: (size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Number of stored values (the sentry excluded).
    pub fn len(&self) -> usize {
        self.values.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.values[index]
    }

    /// Append a value without hash-consing it and return its index.
    pub fn add(&mut self, value: T) -> usize {
        self.values.push(value);
        self.next.push(0);
        self.values.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find the index of an equal value, or insert `value` and return its new index.
    pub fn put(&mut self, value: T) -> usize {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket] as usize;
        while index != 0 {
            if self.values[index] == value {
                return index;
            }
            index = self.next[index] as usize;
        }

        let index = self.add(value);
        self.next[index] = self.buckets[bucket];
        assert!(index < i32::MAX as usize, "Storage is full");
        self.buckets[bucket] = index as u32;

        if self.len() > 2 * self.buckets.len() {
            self.grow();
        }
        index
    }

    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        self.buckets = vec![0; size];
        self.bitmask = (size - 1) as u64;
        for index in 1..self.values.len() {
            let bucket = self.bucket_index(&self.values[index]);
            self.next[index] = self.buckets[bucket];
            self.buckets[bucket] = index as u32;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2);
        let index = table.add(Item(42));
        assert_eq!(index, 1);
        assert_eq!(table[index], Item(42));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_put_dedups() {
        let mut table = Table::new(2);
        let a = table.put(Item(5));
        let b = table.put(Item(-5)); // same bucket, different value
        let c = table.put(Item(5));
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_grow_keeps_values_reachable() {
        let mut table = Table::new(1);
        let indices: Vec<usize> = (0..100).map(|i| table.put(Item(i))).collect();
        assert!(table.num_buckets() > 2);
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(table.put(Item(i as i32)), index);
        }
        assert_eq!(table.len(), 100);
    }

    #[test]
    #[should_panic(expected = "Index is 0")]
    fn test_sentry_is_not_a_value() {
        let table = Table::<Item>::new(1);
        table.value(0);
    }
}
