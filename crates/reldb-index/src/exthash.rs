//! Extendible-hashing map.
//!
//! Buckets live in an arena and are referenced through a directory of
//! `2^D` slots, where `D` is the global depth. A key routes to the
//! directory slot selected by the low `D` bits of its hash; every key
//! in a bucket agrees on the low `local_depth` bits. A full bucket
//! with `local_depth < D` splits in place by the next hash bit,
//! rewiring only the directory entries that referenced it; when
//! `local_depth == D` the directory doubles first.

use std::fmt;
use std::hash::{BuildHasher, Hash};

use reldb_common::{RelError, Result};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::constants::{BUCKET_SLOTS, DEFAULT_BUCKETS};
use crate::map::{AssocMap, PutOutcome};

/// Index of a bucket within the arena.
type BucketId = usize;

#[derive(Debug, Clone)]
struct Bucket<K, V> {
    /// Number of low hash bits all keys in this bucket agree on.
    local_depth: u32,
    entries: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: u32) -> Self {
        Self {
            local_depth,
            entries: Vec::with_capacity(BUCKET_SLOTS),
        }
    }
}

/// An unordered key-value map with expected-O(1) lookup that grows by
/// doubling its directory.
///
/// `put` overwrites on an equal key: keys are unique.
#[derive(Debug)]
pub struct ExtHashMap<K, V, S = Xxh3Builder> {
    /// Directory: `2^global_depth` slots referencing buckets.
    directory: Vec<BucketId>,
    /// Bucket arena (buckets in allocation order).
    buckets: Vec<Bucket<K, V>>,
    global_depth: u32,
    /// Key-value slots per bucket.
    slots: usize,
    len: usize,
    hash_builder: S,
}

impl<K, V> ExtHashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a map with the default initial directory size.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Creates a map with `initial_buckets` directory slots (a power
    /// of two), one bucket per slot.
    pub fn with_buckets(initial_buckets: usize) -> Self {
        assert!(
            initial_buckets.is_power_of_two(),
            "initial bucket count must be a power of two"
        );
        let global_depth = initial_buckets.trailing_zeros();
        Self {
            directory: (0..initial_buckets).collect(),
            buckets: (0..initial_buckets)
                .map(|_| Bucket::new(global_depth))
                .collect(),
            global_depth,
            slots: BUCKET_SLOTS,
            len: 0,
            hash_builder: Xxh3Builder::new(),
        }
    }
}

impl<K, V> Default for ExtHashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ExtHashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Returns the routing hash of a key, so callers can reason about
    /// bucket placement (used by diagnostics and tests).
    pub fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Returns the global depth `D` (directory size is `2^D`).
    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    /// Returns the number of directory slots.
    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    /// Returns the number of distinct buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the local depth of the bucket referenced by the given
    /// directory slot.
    pub fn local_depth(&self, slot: usize) -> u32 {
        self.buckets[self.directory[slot]].local_depth
    }

    fn dir_slot(&self, hash: u64) -> usize {
        (hash & ((1u64 << self.global_depth) - 1)) as usize
    }

    fn find(&self, key: &K) -> Option<(BucketId, usize)> {
        let bucket = self.directory[self.dir_slot(self.hash_of(key))];
        self.buckets[bucket]
            .entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|i| (bucket, i))
    }

    /// Splits a full bucket by its next hash bit, rewiring the
    /// directory entries that referenced it.
    fn split_bucket(&mut self, bucket: BucketId) {
        let depth = self.buckets[bucket].local_depth;
        debug_assert!(depth < self.global_depth);

        let entries = std::mem::take(&mut self.buckets[bucket].entries);
        self.buckets[bucket].local_depth = depth + 1;
        let sibling = self.buckets.len();
        self.buckets.push(Bucket::new(depth + 1));

        // Redistribute by bit `depth` of the hash.
        for (key, value) in entries {
            let high = (self.hash_of(&key) >> depth) & 1 == 1;
            let target = if high { sibling } else { bucket };
            self.buckets[target].entries.push((key, value));
        }

        // Directory slots whose bit `depth` is set now reference the
        // sibling.
        for (slot, entry) in self.directory.iter_mut().enumerate() {
            if *entry == bucket && (slot >> depth) & 1 == 1 {
                *entry = sibling;
            }
        }
    }

    /// Doubles the directory: every entry is duplicated into the upper
    /// half, so both halves of each hash class reference the same
    /// bucket until it splits.
    fn double_directory(&mut self) {
        let old_len = self.directory.len();
        self.directory.extend_from_within(..old_len);
        self.global_depth += 1;
    }

    /// Checks the directory invariant: every key in the bucket
    /// referenced by slot `i` agrees with `i` on the bucket's low
    /// `local_depth` hash bits.
    pub fn validate(&self) -> Result<()> {
        if self.directory.len() != 1usize << self.global_depth {
            return Err(RelError::IndexCorrupted(format!(
                "directory size {} does not match global depth {}",
                self.directory.len(),
                self.global_depth
            )));
        }
        for (slot, &bucket) in self.directory.iter().enumerate() {
            let depth = self.buckets[bucket].local_depth;
            if depth > self.global_depth {
                return Err(RelError::IndexCorrupted(
                    "bucket local depth exceeds global depth".to_string(),
                ));
            }
            let mask = (1u64 << depth) - 1;
            for (key, _) in &self.buckets[bucket].entries {
                if self.hash_of(key) & mask != (slot as u64) & mask {
                    return Err(RelError::IndexCorrupted(format!(
                        "key hashed outside its bucket class at slot {}",
                        slot
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<K, V, S> AssocMap<K, V> for ExtHashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|(bucket, i)| &self.buckets[bucket].entries[i].1)
    }

    fn put(&mut self, key: K, value: V) -> PutOutcome<V> {
        if let Some((bucket, i)) = self.find(&key) {
            let old = std::mem::replace(&mut self.buckets[bucket].entries[i].1, value);
            return PutOutcome::Replaced(old);
        }

        let hash = self.hash_of(&key);
        loop {
            let bucket = self.directory[self.dir_slot(hash)];
            if self.buckets[bucket].entries.len() < self.slots {
                self.buckets[bucket].entries.push((key, value));
                self.len += 1;
                return PutOutcome::Inserted;
            }
            if self.buckets[bucket].local_depth < self.global_depth {
                self.split_bucket(bucket);
            } else {
                self.double_directory();
            }
        }
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.buckets
            .iter()
            .flat_map(|b| b.entries.iter().cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<K, V, S> fmt::Display for ExtHashMap<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ExtHashMap (global depth {})", self.global_depth)?;
        for (slot, &bucket) in self.directory.iter().enumerate() {
            write!(f, "{}: [", slot)?;
            for (i, (key, value)) in self.buckets[bucket].entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} / {}", key, value)?;
            }
            writeln!(f, "] (local depth {})", self.buckets[bucket].local_depth)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map() {
        let map: ExtHashMap<u64, u64> = ExtHashMap::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert_eq!(map.directory_len(), DEFAULT_BUCKETS);
        assert!(map.get(&1).is_none());
        map.validate().unwrap();
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_non_power_of_two_panics() {
        let _map: ExtHashMap<u64, u64> = ExtHashMap::with_buckets(3);
    }

    #[test]
    fn test_put_and_get() {
        let mut map = ExtHashMap::new();
        for i in 0u64..100 {
            assert_eq!(map.put(i, i * i), PutOutcome::Inserted);
        }
        assert_eq!(map.len(), 100);
        for i in 0u64..100 {
            assert_eq!(map.get(&i), Some(&(i * i)));
        }
        map.validate().unwrap();
    }

    #[test]
    fn test_put_overwrites_equal_key() {
        let mut map = ExtHashMap::new();
        assert_eq!(map.put(7u64, 1), PutOutcome::Inserted);
        assert_eq!(map.put(7u64, 2), PutOutcome::Replaced(1));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&2));
    }

    #[test]
    fn test_directory_grows_under_load() {
        let mut map = ExtHashMap::with_buckets(4);
        for i in 0u64..200 {
            map.put(i, i);
        }
        assert!(map.directory_len() > 4);
        assert!(map.global_depth() > 2);
        assert_eq!(map.len(), 200);
        map.validate().unwrap();
    }

    #[test]
    fn test_split_preserves_all_keys() {
        let mut map = ExtHashMap::with_buckets(4);
        let mut expected = Vec::new();
        for i in 0u64..64 {
            map.put(i, i + 1000);
            expected.push((i, i + 1000));
        }
        let mut entries = map.entries();
        entries.sort();
        assert_eq!(entries, expected);
        map.validate().unwrap();
    }

    #[test]
    fn test_colliding_keys_deepen_one_bucket() {
        let map_probe: ExtHashMap<u64, u64> = ExtHashMap::with_buckets(4);
        // Keys that all route to directory slot 0 at depth 2.
        let colliding: Vec<u64> = (0u64..)
            .filter(|k| map_probe.hash_of(k) % 4 == 0)
            .take(17)
            .collect();

        let mut map = ExtHashMap::with_buckets(4);
        for &k in &colliding {
            map.put(k, k);
        }
        assert!(map.directory_len() >= 8);
        assert!(map.local_depth(0) >= 3);
        for &k in &colliding {
            assert_eq!(map.get(&k), Some(&k));
        }
        map.validate().unwrap();
    }

    #[test]
    fn test_string_keys() {
        let mut map = ExtHashMap::new();
        for word in ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"] {
            map.put(word.to_string(), word.len());
        }
        assert_eq!(map.get(&"charlie".to_string()), Some(&7));
        assert!(map.get(&"golf".to_string()).is_none());
        map.validate().unwrap();
    }

    #[test]
    fn test_display_lists_directory() {
        let mut map = ExtHashMap::with_buckets(4);
        map.put(1u64, 10u64);
        let rendered = map.to_string();
        assert!(rendered.contains("ExtHashMap"));
        assert!(rendered.contains("local depth"));
    }
}
