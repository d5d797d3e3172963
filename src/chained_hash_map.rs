//! ChainedHashMap: bucket table of singly linked chains stored in an arena.
//!
//! Entries live in a generational `SlotMap`; a bucket slot holds the arena key
//! of its chain head and every entry holds the key of its successor. Each arena
//! key sits in exactly one link position, so chains cannot share nodes or form
//! cycles, and rehashing only rewrites links.

use crate::error::{MapError, Result};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::mem;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Table length used by [`ChainedHashMap::new`] and restored by
/// [`ChainedHashMap::clear`].
pub const INITIAL_CAPACITY: usize = 13;

/// Largest `len / table_len` a `put` may leave behind.
pub const MAX_LOAD_FACTOR: f64 = 0.67;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<DefaultKey>,
}

type Slots<K, V> = SlotMap<DefaultKey, Entry<K, V>>;

pub struct ChainedHashMap<K, V, S = RandomState> {
    hasher: S,
    table: Vec<Option<DefaultKey>>,
    slots: Slots<K, V>,
    reentrancy: DebugReentrancy,
}

/// Hashes are unsigned, so the bucket is always inside `0..len`.
#[inline]
fn bucket_of(hash: u64, len: usize) -> usize {
    (hash % len as u64) as usize
}

fn empty_table(len: usize) -> Vec<Option<DefaultKey>> {
    vec![None; len]
}

/// Moves every chained entry of `old` into a fresh table of `new_len` buckets.
///
/// Old buckets are visited in index order and each chain head-to-tail; every
/// entry is pushed onto the head of its new bucket, so entries that collide
/// again come out in reverse visiting order. Only links change: no entry is
/// dropped, cloned or rehashed through `K: Hash`.
fn relink<K, V>(
    slots: &mut Slots<K, V>,
    old: Vec<Option<DefaultKey>>,
    new_len: usize,
) -> Vec<Option<DefaultKey>> {
    let mut table = empty_table(new_len);
    let total = slots.len();
    let mut moved = 0;
    for head in old {
        if moved == total {
            break;
        }
        let mut cursor = head;
        while let Some(k) = cursor {
            let Some(entry) = slots.get_mut(k) else {
                break;
            };
            cursor = entry.next;
            let b = bucket_of(entry.hash, new_len);
            entry.next = table[b];
            table[b] = Some(k);
            moved += 1;
        }
    }
    table
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Creates a map whose table has exactly `capacity` buckets.
    ///
    /// Fails with [`MapError::InvalidArgument`] when `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V> Default for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            table: empty_table(INITIAL_CAPACITY),
            slots: SlotMap::with_key(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self> {
        if capacity == 0 {
            return Err(MapError::InvalidArgument {
                reason: "capacity must be positive",
            });
        }
        Ok(Self {
            hasher,
            table: empty_table(capacity),
            slots: SlotMap::with_key(),
            reentrancy: DebugReentrancy::new(),
        })
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Arena key of the entry matching `q` in `bucket`, if any.
    fn find_in_chain<Q>(&self, bucket: usize, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cursor = self.table[bucket];
        while let Some(k) = cursor {
            let entry = self.slots.get(k)?;
            if entry.hash == hash && entry.key.borrow() == q {
                return Some(k);
            }
            cursor = entry.next;
        }
        None
    }

    fn locate<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.find_in_chain(bucket_of(hash, self.table.len()), hash, q)
    }

    fn would_exceed_max_load(&self, entries: usize) -> bool {
        entries as f64 / self.table.len() as f64 > MAX_LOAD_FACTOR
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets in the backing table.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.table.len() as f64
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Associates `value` with `key`, returning the value it replaced.
    ///
    /// The load check runs first and assumes the key is new: if one more
    /// entry would push the load factor above [`MAX_LOAD_FACTOR`], the table
    /// grows to `2 * table_len + 1` even when `key` is already present.
    /// An existing entry keeps its chain position and only its value is
    /// swapped; a new entry becomes the head of its bucket.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter("put");
        if self.would_exceed_max_load(self.len() + 1) {
            let grown = 2 * self.table.len() + 1;
            log::debug!(
                "growing table from {} to {} buckets at {} entries",
                self.table.len(),
                grown,
                self.slots.len()
            );
            self.table = relink(&mut self.slots, mem::take(&mut self.table), grown);
        }

        let hash = self.make_hash(&key);
        let bucket = bucket_of(hash, self.table.len());
        if let Some(entry) = self
            .find_in_chain(bucket, hash, &key)
            .and_then(|k| self.slots.get_mut(k))
        {
            return Some(mem::replace(&mut entry.value, value));
        }

        let next = self.table[bucket];
        let k = self.slots.insert(Entry {
            key,
            value,
            hash,
            next,
        });
        self.table[bucket] = Some(k);
        None
    }

    /// Returns the value stored under `q` or [`MapError::NotFound`].
    pub fn get<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("get");
        self.locate(q)
            .and_then(|k| self.slots.get(k))
            .map(|e| &e.value)
            .ok_or(MapError::NotFound)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("get_mut");
        let k = self.locate(q).ok_or(MapError::NotFound)?;
        self.slots
            .get_mut(k)
            .map(|e| &mut e.value)
            .ok_or(MapError::NotFound)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("contains_key");
        self.locate(q).is_some()
    }

    /// Unlinks the entry for `q` and returns its value.
    ///
    /// A head match moves the bucket head to its successor; an interior match
    /// is spliced out by pointing its predecessor past it. Fails with
    /// [`MapError::NotFound`] without touching the map when `q` is absent.
    pub fn remove<Q>(&mut self, q: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let g = self.reentrancy.enter("remove");
        let hash = self.make_hash(q);
        let bucket = bucket_of(hash, self.table.len());

        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.table[bucket];
        while let Some(k) = cursor {
            let entry = self.slots.get(k).ok_or(MapError::NotFound)?;
            if entry.hash == hash && entry.key.borrow() == q {
                let next = entry.next;
                match prev {
                    None => self.table[bucket] = next,
                    Some(p) => {
                        if let Some(before) = self.slots.get_mut(p) {
                            before.next = next;
                        }
                    }
                }
                let removed = self.slots.remove(k).ok_or(MapError::NotFound)?;
                // The chain is consistent again; the key's Drop may use the map.
                drop(g);
                return Ok(removed.value);
            }
            prev = cursor;
            cursor = entry.next;
        }
        Err(MapError::NotFound)
    }

    /// Replaces the table with one of `new_len` buckets and rehashes every
    /// entry into it.
    ///
    /// The load factor is not consulted, so the result may exceed
    /// [`MAX_LOAD_FACTOR`]. Fails with [`MapError::InvalidArgument`] when
    /// `new_len` is zero or smaller than [`len`](Self::len).
    pub fn resize_backing_table(&mut self, new_len: usize) -> Result<()> {
        let _g = self.reentrancy.enter("resize_backing_table");
        if new_len < self.len() {
            return Err(MapError::InvalidArgument {
                reason: "table length is smaller than the number of entries",
            });
        }
        if new_len == 0 {
            return Err(MapError::InvalidArgument {
                reason: "table length must be positive",
            });
        }
        log::debug!(
            "resizing table from {} to {} buckets at {} entries",
            self.table.len(),
            new_len,
            self.slots.len()
        );
        self.table = relink(&mut self.slots, mem::take(&mut self.table), new_len);
        Ok(())
    }

    /// Drops every entry and resets the table to [`INITIAL_CAPACITY`]
    /// buckets, whatever its length was before.
    pub fn clear(&mut self) {
        let g = self.reentrancy.enter("clear");
        log::trace!(
            "clearing {} entries, table {} -> {} buckets",
            self.slots.len(),
            self.table.len(),
            INITIAL_CAPACITY
        );
        self.table = empty_table(INITIAL_CAPACITY);
        let discarded = mem::take(&mut self.slots);
        drop(g);
        drop(discarded);
    }

    /// Keys in table order: ascending bucket index, then head-to-tail.
    pub fn key_set(&self) -> hashbrown::HashSet<&K> {
        let mut keys = hashbrown::HashSet::with_capacity(self.len());
        keys.extend(self.iter().map(|(k, _)| k));
        keys
    }

    /// Values in table order: ascending bucket index, then head-to-tail.
    pub fn values(&self) -> Vec<&V> {
        self.iter().map(|(_, v)| v).collect()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.table.iter(),
            slots: &self.slots,
            cursor: None,
            remaining: self.slots.len(),
        }
    }

    /// Walks the chain stored in bucket `index`, head first.
    ///
    /// Returns `None` when `index` is outside the table.
    pub fn bucket(&self, index: usize) -> Option<Chain<'_, K, V>> {
        let head = *self.table.get(index)?;
        Some(Chain {
            slots: &self.slots,
            cursor: head,
        })
    }

    /// Asserts the structural invariants: every arena entry is reachable
    /// from exactly one bucket, sits in the bucket its hash selects, and
    /// no key appears twice.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = std::collections::HashSet::new();
        for (b, head) in self.table.iter().enumerate() {
            let mut cursor = *head;
            while let Some(k) = cursor {
                assert!(seen.insert(k), "entry linked twice or chain has a cycle");
                let entry = self.slots.get(k).expect("dangling chain link");
                assert_eq!(bucket_of(entry.hash, self.table.len()), b);
                assert_eq!(entry.hash, self.make_hash(&entry.key));
                cursor = entry.next;
            }
        }
        assert_eq!(seen.len(), self.slots.len(), "unreachable arena entries");
        let distinct: std::collections::HashSet<&K> = self.slots.values().map(|e| &e.key).collect();
        assert_eq!(distinct.len(), self.slots.len(), "duplicate keys");
    }
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`ChainedHashMap`] in table order.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Option<DefaultKey>>,
    slots: &'a Slots<K, V>,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        // Trailing buckets are never visited once every entry has been seen.
        while self.remaining > 0 {
            if let Some(k) = self.cursor {
                let entry = self.slots.get(k)?;
                self.cursor = entry.next;
                self.remaining -= 1;
                return Some((&entry.key, &entry.value));
            }
            self.cursor = *self.buckets.next()?;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over one bucket's chain, head to tail.
pub struct Chain<'a, K, V> {
    slots: &'a Slots<K, V>,
    cursor: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.get(self.cursor?)?;
        self.cursor = entry.next;
        Some((&entry.key, &entry.value))
    }
}
