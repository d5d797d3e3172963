#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can use the
// structural consistency check, which is not part of the public API.

use crate::chained_hash_map::{ChainedHashMap, INITIAL_CAPACITY, MAX_LOAD_FACTOR};
use crate::error::MapError;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Resize(usize),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (0usize..40).prop_map(OpI::Resize),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Runs one scenario against `sut`, mirroring every operation on a
// std::collections::HashMap model.
fn run_scenario<S: BuildHasher>(
    mut sut: ChainedHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                let len_before = sut.len();
                let prev = sut.put(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
                if prev.is_some() {
                    prop_assert_eq!(sut.len(), len_before, "replacing must not change len");
                }
                prop_assert!(sut.load_factor() <= MAX_LOAD_FACTOR);
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                match model.remove(&k) {
                    Some(mv) => prop_assert_eq!(sut.remove(&k), Ok(mv)),
                    None => {
                        let table_before = sut.table_len();
                        prop_assert_eq!(sut.remove(&k), Err(MapError::NotFound));
                        prop_assert_eq!(sut.table_len(), table_before);
                    }
                }
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k).ok(), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                match sut.get_mut(&k) {
                    Ok(vr) => {
                        *vr = vr.saturating_add(d);
                        let mv = model.get_mut(&k).expect("present in model");
                        *mv = mv.saturating_add(d);
                    }
                    Err(e) => {
                        prop_assert_eq!(e, MapError::NotFound);
                        prop_assert!(!model.contains_key(&k));
                    }
                }
            }
            OpI::Resize(n) => {
                let table_before = sut.table_len();
                match sut.resize_backing_table(n) {
                    Ok(()) => prop_assert_eq!(sut.table_len(), n),
                    Err(MapError::InvalidArgument { .. }) => {
                        prop_assert!(n == 0 || n < model.len());
                        prop_assert_eq!(sut.table_len(), table_before);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.table_len(), INITIAL_CAPACITY);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.key_set().into_iter().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                let from_iter: Vec<i32> = sut.iter().map(|(_, v)| *v).collect();
                let from_values: Vec<i32> = sut.values().into_iter().copied().collect();
                prop_assert_eq!(from_iter, from_values);
            }
        }

        // Post-conditions after each op
        sut.assert_consistent();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Ok(v));
        }
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `put` returns the replaced value exactly when the model had the key.
// - `len` tracks the number of distinct keys; replacing never changes it.
// - The load factor never exceeds the maximum after a `put`.
// - `remove`/`get` of absent keys fail with NotFound and change nothing.
// - Explicit resizes below `len` (or to zero) fail and change nothing.
// - `clear` always lands on the initial table length.
// - Every entry is reachable from exactly one bucket, the one its hash selects.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(capacity in 1usize..20, (pool, ops) in arb_scenario()) {
        let sut: ChainedHashMap<Key, i32> =
            ChainedHashMap::with_capacity(capacity).expect("positive capacity");
        run_scenario(sut, &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, with every key in bucket
// zero. This stresses head, interior and tail unlinking and in-place
// replacement inside one long chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: ChainedHashMap<Key, i32, ConstBuildHasher> =
            ChainedHashMap::with_hasher(ConstBuildHasher);
        run_scenario(sut, &pool, ops)?;
    }
}
