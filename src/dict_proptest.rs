#![cfg(test)]

// Property tests for Dict kept inside the crate so every step can audit
// the table internals (bucket discipline, conservation, rehash frontier).

use crate::dict::{Dict, InsertError};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    Take(usize),
    Get(usize),
    Bump(usize, i32),
    Rehash(u8),
    Expand(u16),
    Shrink,
    Iterate,
    Scan,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Add(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Take),
            idx.clone().prop_map(OpI::Get),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Bump(i, d)),
            (0u8..8).prop_map(OpI::Rehash),
            (0u16..256).prop_map(OpI::Expand),
            Just(OpI::Shrink),
            Just(OpI::Iterate),
            Just(OpI::Scan),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S>(
    mut sut: Dict<String, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Add(i, v) => {
                let k = pool[i].clone();
                let already = model.contains_key(&k);
                match sut.add(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!already, "add must fail on duplicate");
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey) => {
                        prop_assert!(already, "duplicate error only when key exists");
                    }
                }
            }
            OpI::Replace(i, v) => {
                let k = pool[i].clone();
                let old = sut.replace(k.clone(), v);
                prop_assert_eq!(old, model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k.as_str()), model.remove(k).is_some());
            }
            OpI::Take(i) => {
                let k = &pool[i];
                let taken = sut.take(k.as_str());
                let expected = model.remove_entry(k);
                prop_assert_eq!(taken, expected);
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k.as_str()), model.get(k));
                prop_assert_eq!(sut.contains_key(k.as_str()), model.contains_key(k));
            }
            OpI::Bump(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k.as_str()), model.get_mut(k)) {
                    (Some(a), Some(b)) => {
                        *a = a.saturating_add(d);
                        *b = b.saturating_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "presence must agree with the model"),
                }
            }
            OpI::Rehash(n) => {
                sut.rehash(n as usize);
            }
            OpI::Expand(n) => {
                // Refusals (mid-rehash, too small, unchanged) are part of
                // the contract and ignorable.
                let _ = sut.expand(n as usize);
            }
            OpI::Shrink => {
                let _ = sut.shrink();
            }
            OpI::Iterate => {
                let seen: BTreeSet<String> = sut.iter().map(|(k, _)| k.clone()).collect();
                let expected: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(seen, expected);
            }
            OpI::Scan => {
                let mut seen: BTreeSet<String> = BTreeSet::new();
                let mut cursor = 0;
                loop {
                    cursor = sut.scan(cursor, |k, _| {
                        seen.insert(k.clone());
                    });
                    if cursor == 0 {
                        break;
                    }
                }
                let expected: BTreeSet<String> = model.keys().cloned().collect();
                prop_assert_eq!(seen, expected);
            }
        }

        // Post-conditions after each op.
        sut.audit();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// under random interleavings of mutation, resize requests, manual rehash
// steps, iteration, and scans.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(Dict::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher so every key lands in one
// bucket; this stresses chain unlinking and migration order.
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(Dict::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: a scan that runs to completion emits every stable key at
// least once, no matter how volatile keys and rehash steps interleave
// between scan calls.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_scan_keeps_stable_keys(
        stable in 1usize..=120,
        churn in proptest::collection::vec((any::<u16>(), 0u8..3), 1..60),
    ) {
        let mut d: Dict<String, usize> = Dict::new();
        for i in 0..stable {
            d.add(format!("stable:{i}"), i).expect("fresh key");
        }

        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut cursor = 0;
        let mut churn = churn.into_iter();
        loop {
            cursor = d.scan(cursor, |k, _| {
                if k.starts_with("stable:") {
                    seen.insert(k.clone());
                }
            });
            if cursor == 0 {
                break;
            }
            if let Some((volatile, action)) = churn.next() {
                let key = format!("volatile:{}", volatile % 64);
                match action {
                    0 => {
                        let _ = d.replace(key, usize::from(volatile));
                    }
                    1 => {
                        d.remove(&key);
                    }
                    _ => {
                        d.rehash(1);
                    }
                }
            }
        }

        for i in 0..stable {
            let key = format!("stable:{i}");
            prop_assert!(seen.contains(&key), "{} was missed by the scan", key);
        }
        d.audit();
    }
}
