//! Linear-hashing map.
//!
//! The table grows one home bucket at a time behind a split pointer.
//! A key's home index is `h mod mod1`, redirected through `h mod mod2`
//! (`mod2 = 2 * mod1`) once its low-resolution index falls below the
//! split pointer. Overfull home buckets chain overflow buckets; a
//! controlled split of the bucket at the split pointer keeps the load
//! factor at or below one. When the split pointer wraps, the round
//! doubles.

use std::fmt;
use std::hash::{BuildHasher, Hash};

use reldb_common::{RelError, Result};
use xxhash_rust::xxh3::Xxh3Builder;

use crate::constants::{BUCKET_SLOTS, DEFAULT_BUCKETS, MAX_LOAD_FACTOR};
use crate::map::{AssocMap, PutOutcome};

#[derive(Debug, Clone)]
struct Bucket<K, V> {
    entries: Vec<(K, V)>,
    /// Overflow chain.
    next: Option<Box<Bucket<K, V>>>,
}

impl<K, V> Bucket<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::with_capacity(BUCKET_SLOTS),
            next: None,
        }
    }

    /// Iterates the entries of this bucket and its overflow chain.
    fn iter_chain(&self) -> ChainIter<'_, K, V> {
        ChainIter {
            bucket: Some(self),
            slot: 0,
        }
    }

    /// Returns the stored value for `key` anywhere in the chain.
    fn value_mut(&mut self, key: &K) -> Option<&mut V>
    where
        K: PartialEq,
    {
        if let Some(i) = self.entries.iter().position(|(k, _)| k == key) {
            return Some(&mut self.entries[i].1);
        }
        self.next.as_deref_mut().and_then(|next| next.value_mut(key))
    }

    /// Places an entry in the first chain bucket with room, extending
    /// the chain when every bucket is full.
    fn place(&mut self, slots: usize, key: K, value: V) {
        if self.entries.len() < slots {
            self.entries.push((key, value));
        } else if let Some(next) = self.next.as_deref_mut() {
            next.place(slots, key, value);
        } else {
            let mut overflow = Bucket::new();
            overflow.entries.push((key, value));
            self.next = Some(Box::new(overflow));
        }
    }
}

struct ChainIter<'a, K, V> {
    bucket: Option<&'a Bucket<K, V>>,
    slot: usize,
}

impl<'a, K, V> Iterator for ChainIter<'a, K, V> {
    type Item = &'a (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bucket = self.bucket?;
            if self.slot < bucket.entries.len() {
                let entry = &bucket.entries[self.slot];
                self.slot += 1;
                return Some(entry);
            }
            self.bucket = bucket.next.as_deref();
            self.slot = 0;
        }
    }
}

/// An unordered key-value map that grows gradually: one controlled
/// split per overload, with overflow chains absorbing skew between
/// splits.
///
/// `put` overwrites on an equal key: keys are unique.
#[derive(Debug)]
pub struct LinHashMap<K, V, S = Xxh3Builder> {
    /// Home buckets; index `mod1 + split` is allocated on each split.
    table: Vec<Bucket<K, V>>,
    /// Current round size (`mod1`); `mod2 = 2 * mod1`.
    round: usize,
    /// Index of the next home bucket to split, in `[0, mod1)`.
    split: usize,
    /// Key-value slots per bucket.
    slots: usize,
    len: usize,
    hash_builder: S,
}

impl<K, V> LinHashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a map with the default initial home bucket count.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Creates a map with `initial_buckets` home buckets (a power of
    /// two).
    pub fn with_buckets(initial_buckets: usize) -> Self {
        assert!(
            initial_buckets.is_power_of_two(),
            "initial bucket count must be a power of two"
        );
        Self {
            table: (0..initial_buckets).map(|_| Bucket::new()).collect(),
            round: initial_buckets,
            split: 0,
            slots: BUCKET_SLOTS,
            len: 0,
            hash_builder: Xxh3Builder::new(),
        }
    }
}

impl<K, V> Default for LinHashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> LinHashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Returns the routing hash of a key (used by diagnostics and
    /// tests).
    pub fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Returns the current round size (`mod1`).
    pub fn round_size(&self) -> usize {
        self.round
    }

    /// Returns the split pointer.
    pub fn split_ptr(&self) -> usize {
        self.split
    }

    /// Returns the current load factor: keys per home slot.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / (self.slots * self.round) as f64
    }

    /// Selects the home bucket for a hash: `h mod mod1`, redirected
    /// through `h mod mod2` below the split pointer.
    fn bucket_index(&self, hash: u64) -> usize {
        let low = (hash % self.round as u64) as usize;
        if low < self.split {
            (hash % (2 * self.round) as u64) as usize
        } else {
            low
        }
    }

    /// Places an entry along the chain at `index`. Does not touch the
    /// key count.
    fn place(&mut self, index: usize, key: K, value: V) {
        let slots = self.slots;
        self.table[index].place(slots, key, value);
    }

    /// Splits the home bucket at the split pointer: a fresh bucket is
    /// allocated at `mod1 + split`, the split bucket's chain is
    /// rehashed under `mod2`, and the split pointer advances (wrapping
    /// doubles the round).
    fn split_next(&mut self) {
        let target = self.round + self.split;
        debug_assert_eq!(target, self.table.len());
        self.table.push(Bucket::new());

        let old = std::mem::replace(&mut self.table[self.split], Bucket::new());
        let mod2 = (2 * self.round) as u64;

        let mut chain = Some(Box::new(old));
        while let Some(mut bucket) = chain {
            chain = bucket.next.take();
            for (key, value) in bucket.entries.drain(..) {
                let index = (self.hash_of(&key) % mod2) as usize;
                debug_assert!(index == self.split || index == target);
                self.place(index, key, value);
            }
        }

        if self.split == self.round - 1 {
            self.split = 0;
            self.round *= 2;
        } else {
            self.split += 1;
        }
    }

    /// Checks the routing invariant: every stored key is reachable
    /// from the bucket the selection rule names for it.
    pub fn validate(&self) -> Result<()> {
        if self.table.len() != self.round + self.split {
            return Err(RelError::IndexCorrupted(format!(
                "table holds {} buckets, expected {} + {}",
                self.table.len(),
                self.round,
                self.split
            )));
        }
        let mut seen = 0;
        for (index, bucket) in self.table.iter().enumerate() {
            for (key, _) in bucket.iter_chain() {
                seen += 1;
                let expected = self.bucket_index(self.hash_of(key));
                if expected != index {
                    return Err(RelError::IndexCorrupted(format!(
                        "key stored in bucket {} but routed to {}",
                        index, expected
                    )));
                }
            }
        }
        if seen != self.len {
            return Err(RelError::IndexCorrupted(format!(
                "stored {} keys but counted {}",
                self.len, seen
            )));
        }
        Ok(())
    }
}

impl<K, V, S> AssocMap<K, V> for LinHashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        let index = self.bucket_index(self.hash_of(key));
        self.table[index]
            .iter_chain()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn put(&mut self, key: K, value: V) -> PutOutcome<V> {
        let index = self.bucket_index(self.hash_of(&key));

        // Overwrite in place when the key is already present.
        if let Some(slot) = self.table[index].value_mut(&key) {
            let old = std::mem::replace(slot, value);
            return PutOutcome::Replaced(old);
        }

        self.place(index, key, value);
        self.len += 1;
        if self.load_factor() >= MAX_LOAD_FACTOR {
            self.split_next();
        }
        PutOutcome::Inserted
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.table
            .iter()
            .flat_map(|b| b.iter_chain().cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<K, V, S> fmt::Display for LinHashMap<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "LinHashMap (mod1 {}, split {})",
            self.round, self.split
        )?;
        for (index, bucket) in self.table.iter().enumerate() {
            write!(f, "{}: ", index)?;
            let mut current = Some(bucket);
            let mut first_bucket = true;
            while let Some(b) = current {
                if !first_bucket {
                    write!(f, " --> ")?;
                }
                write!(f, "[")?;
                for (i, (key, value)) in b.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} / {}", key, value)?;
                }
                write!(f, "]")?;
                first_bucket = false;
                current = b.next.as_deref();
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
