//! Fixed-size open-addressed hash table keyed by terms.
//!
//! The same slot arithmetic addresses records in the on-disk dictionary, so
//! [`hash_slot`] and [`rehash`] are a contract between the indexer and the
//! query engine: a term written to slot `i` must be found again at slot `i`
//! by a different process holding only the file.

use crate::error::{Error, Result};
use sha1::{Digest, Sha1};

/// Linear probing stride.
pub const PROBE_STRIDE: usize = 3;

/// Combines the value already stored under a key with a newly inserted one.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl Merge for u32 {
    fn merge(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

/// SHA-1 of the key's UTF-8 bytes, read as a big-endian integer, modulo `size`.
pub fn hash_slot(key: &str, size: usize) -> usize {
    let digest = Sha1::digest(key.as_bytes());
    let size = size.max(1) as u128;
    digest
        .iter()
        .fold(0u128, |acc, &b| (acc * 256 + b as u128) % size) as usize
}

/// Next slot of the probe sequence.
#[inline]
pub fn rehash(previous: usize, size: usize) -> usize {
    (previous + PROBE_STRIDE) % size.max(1)
}

enum Probe {
    Found(usize),
    Free(usize),
    Exhausted,
}

pub struct HashTable<V> {
    size: usize,
    keys: Vec<Option<String>>,
    values: Vec<Option<V>>,
    unique_count: usize,
    total_count: usize,
}

impl<V> HashTable<V> {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let mut values = Vec::with_capacity(size);
        values.resize_with(size, || None);
        Self { size, keys: vec![None; size], values, unique_count: 0, total_count: 0 }
    }

    pub fn size(&self) -> usize { self.size }
    pub fn unique_count(&self) -> usize { self.unique_count }
    pub fn total_count(&self) -> usize { self.total_count }
    pub fn is_empty(&self) -> bool { self.unique_count == 0 }

    pub fn hash(&self, key: &str) -> usize { hash_slot(key, self.size) }

    pub fn rehash(&self, previous: usize) -> usize { rehash(previous, self.size) }

    /// Walks the probe sequence for `key`. Gives up once it comes back to the
    /// start slot or has looked at `size` slots.
    fn probe(&self, key: &str) -> Probe {
        let start = self.hash(key);
        let mut pos = start;
        for _ in 0..self.size {
            match &self.keys[pos] {
                None => return Probe::Free(pos),
                Some(k) if k == key => return Probe::Found(pos),
                Some(_) => {}
            }
            pos = self.rehash(pos);
            if pos == start {
                break;
            }
        }
        Probe::Exhausted
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        match self.probe(key) {
            Probe::Found(pos) => self.values[pos].as_ref(),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        matches!(self.probe(key), Probe::Found(_))
    }

    /// Clears keys, values and counters. The size is kept.
    pub fn reset(&mut self) {
        self.keys.iter_mut().for_each(|k| *k = None);
        self.values.iter_mut().for_each(|v| *v = None);
        self.unique_count = 0;
        self.total_count = 0;
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &V)> + '_ {
        self.slots()
            .enumerate()
            .filter_map(|(slot, entry)| entry.map(|(k, v)| (slot, k, v)))
    }

    /// Every slot in order, `None` for free ones.
    pub fn slots(&self) -> impl Iterator<Item = Option<(&str, &V)>> + '_ {
        self.keys.iter().zip(self.values.iter()).map(|(k, v)| match (k, v) {
            (Some(k), Some(v)) => Some((k.as_str(), v)),
            _ => None,
        })
    }
}

impl<V: Merge> HashTable<V> {
    /// Places `value` under `key`, merging into the existing value when the
    /// key is already present. `total_count` grows on every call, including
    /// one that fails with [`Error::TableFull`].
    pub fn insert(&mut self, key: &str, value: V) -> Result<()> {
        self.total_count += 1;
        match self.probe(key) {
            Probe::Free(pos) => {
                self.keys[pos] = Some(key.to_string());
                self.values[pos] = Some(value);
                self.unique_count += 1;
                Ok(())
            }
            Probe::Found(pos) => {
                if let Some(existing) = self.values[pos].as_mut() {
                    existing.merge(value);
                }
                Ok(())
            }
            Probe::Exhausted => Err(Error::TableFull { key: key.to_string(), size: self.size }),
        }
    }
}
