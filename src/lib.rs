//! chained-hashmap: a single-threaded hash map that resolves collisions by
//! external chaining and grows on a fixed load-factor threshold.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map whose bucket layout is fully determined, so chain order,
//!   growth points and rehash placement can be observed and tested.
//! - Layout:
//!   - Table: `Vec<Option<DefaultKey>>`, one slot per bucket, holding the
//!     arena key of the chain head.
//!   - Arena: `SlotMap<DefaultKey, Entry<K, V>>`; every entry stores its
//!     key, value, cached hash and the arena key of its successor.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (no atomics, no locks).
//! - Unique keys. `put` on a present key swaps the value in place and keeps
//!   the entry's chain position.
//! - Bucket index is `hash % table_len` with the hash taken as `u64`, so no
//!   hash value can produce an out-of-range or negative index.
//!
//! Growth
//! - `put` checks `(len + 1) / table_len > MAX_LOAD_FACTOR` before looking
//!   at the key. When it trips, the table becomes `2 * table_len + 1` long,
//!   even if the key turns out to be a duplicate.
//! - `resize_backing_table` ignores the load factor and only requires the
//!   new length to be at least `len` (and non-zero).
//! - `clear` always returns to `INITIAL_CAPACITY` buckets.
//!
//! Chain order
//! - New entries are pushed onto the bucket head.
//! - Rehashing walks the old table by ascending bucket, each chain
//!   head-to-tail, and pushes every entry onto its new bucket's head. Entries
//!   that share a new bucket therefore end up reversed.
//! - `iter`, `values` and `key_set` walk buckets in ascending order and each
//!   chain head-to-tail, stopping once `len` entries were produced.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its precomputed `u64` hash; rehashing reuses it and
//!   never calls `K: Hash` again.
//! - `K: Eq`/`K: Hash` run during lookups. A debug-only reentrancy guard
//!   panics if that user code calls back into the same map.
//!
//! Errors
//! - Lookups and removals of absent keys return `MapError::NotFound`.
//!   Invalid capacities or table lengths return `MapError::InvalidArgument`.
//!   A failing call never modifies the map.

mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod error;
mod reentrancy;

// Public surface
pub use chained_hash_map::{Chain, ChainedHashMap, Iter, INITIAL_CAPACITY, MAX_LOAD_FACTOR};
pub use error::{MapError, Result};
