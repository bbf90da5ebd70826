#![cfg(test)]

// Property tests for IntSet against a BTreeSet model. The interesting
// inputs cluster around the encoding boundaries, so values are drawn
// from narrow bands on both sides of each width limit as well as the
// full i64 range.

use crate::int_set::{Encoding, IntSet};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Clone, Debug)]
enum Op {
    Add(i64),
    Remove(i64),
    Contains(i64),
}

fn arb_value() -> impl Strategy<Value = i64> {
    prop_oneof![
        -40_000i64..40_000,
        (i64::from(i32::MIN) - 50_000)..(i64::from(i32::MIN) + 50_000),
        (i64::from(i32::MAX) - 50_000)..(i64::from(i32::MAX) + 50_000),
        any::<i64>(),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        arb_value().prop_map(Op::Add),
        arb_value().prop_map(Op::Remove),
        arb_value().prop_map(Op::Contains),
    ];
    proptest::collection::vec(op, 1..200)
}

// Property: membership, order, and length all track the model, and the
// encoding is exactly the widest requirement ever inserted (it must
// never narrow, even when wide members are removed).
proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut = IntSet::new();
        let mut model: BTreeSet<i64> = BTreeSet::new();
        let mut widest = Encoding::I16;

        for op in ops {
            match op {
                Op::Add(v) => {
                    let added = sut.add(v);
                    prop_assert_eq!(added, model.insert(v));
                    widest = widest.max(Encoding::for_value(v));
                }
                Op::Remove(v) => {
                    prop_assert_eq!(sut.remove(v), model.remove(&v));
                }
                Op::Contains(v) => {
                    prop_assert_eq!(sut.contains(v), model.contains(&v));
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.encoding(), widest);
        }

        // Full-order parity at the end: position i holds the i-th
        // smallest member.
        let members: Vec<i64> = sut.iter().collect();
        let expected: Vec<i64> = model.iter().copied().collect();
        prop_assert_eq!(members, expected);
        for (i, v) in model.iter().enumerate() {
            prop_assert_eq!(sut.get(i), Some(*v));
        }
        prop_assert_eq!(sut.get(model.len()), None);
    }
}

// Property: an upgrade inserts the triggering value at the correct end
// and leaves every prior member intact.
proptest! {
    #[test]
    fn prop_upgrade_keeps_members(
        narrow in proptest::collection::btree_set(-30_000i64..30_000, 1..64),
        wide in prop_oneof![
            40_000i64..=i64::MAX,
            i64::MIN..=-40_000,
        ],
    ) {
        let mut sut = IntSet::new();
        for &v in &narrow {
            sut.add(v);
        }
        prop_assert_eq!(sut.encoding(), Encoding::I16);

        prop_assert!(sut.add(wide));
        prop_assert!(sut.encoding() > Encoding::I16);
        prop_assert_eq!(sut.len(), narrow.len() + 1);
        if wide < 0 {
            prop_assert_eq!(sut.get(0), Some(wide));
        } else {
            prop_assert_eq!(sut.get(narrow.len()), Some(wide));
        }
        for &v in &narrow {
            prop_assert!(sut.contains(v));
        }
    }
}
