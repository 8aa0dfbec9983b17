use std::collections::{BTreeMap, VecDeque};

use proptest::prelude::*;
use sparse_table::SparseTable;

#[derive(Clone, Debug)]
enum Op {
    Set(usize, u32),
    Erase(usize),
    MutatingGet(usize),
    Resize(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), any::<u32>()).prop_map(|(i, v)| Op::Set(i, v)),
        2 => any::<usize>().prop_map(Op::Erase),
        1 => any::<usize>().prop_map(Op::MutatingGet),
        1 => (0..400usize).prop_map(Op::Resize),
    ]
}

/// Applies `ops` to both a table and a `BTreeMap` model, indices wrapped into
/// the current length.
fn run<const G: usize>(
    len: usize,
    ops: &[Op],
) -> (SparseTable<u32, G>, BTreeMap<usize, u32>, usize) {
    let mut table = SparseTable::<u32, G>::with_len(len);
    let mut model = BTreeMap::new();
    let mut len = len;

    for op in ops {
        match *op {
            Op::Set(i, v) if len > 0 => {
                table.set(i % len, v);
                model.insert(i % len, v);
            }
            Op::Erase(i) if len > 0 => {
                assert_eq!(table.erase(i % len), model.remove(&(i % len)));
            }
            Op::MutatingGet(i) if len > 0 => {
                let value = table.mutating_get(i % len);
                *value = value.wrapping_add(1);

                let expected = model.entry(i % len).or_default();
                *expected = expected.wrapping_add(1);
            }
            Op::Resize(n) => {
                table.resize(n);
                model.retain(|&i, _| i < n);
                len = n;
            }
            _ => {}
        }
    }

    (table, model, len)
}

fn check_against_model<const G: usize>(
    table: &SparseTable<u32, G>,
    model: &BTreeMap<usize, u32>,
    len: usize,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(table.len(), len);
    prop_assert_eq!(table.num_nonempty(), model.len());

    let assigned = (0..len).filter(|&i| table.test(i)).count();
    prop_assert_eq!(assigned, table.num_nonempty());

    for i in 0..len {
        prop_assert_eq!(table.try_get(i), model.get(&i));
        prop_assert_eq!(*table.get(i), model.get(&i).copied().unwrap_or_default());
    }

    let indexed: Vec<_> = table.indexed().map(|(i, v)| (i, *v)).collect();
    let expected: Vec<_> = model.iter().map(|(&i, &v)| (i, v)).collect();
    prop_assert_eq!(&indexed, &expected);

    let values: Vec<_> = table.nonempty().copied().collect();
    let expected_values: Vec<_> = model.values().copied().collect();
    prop_assert_eq!(&values, &expected_values);

    let mut reversed: Vec<_> = table.nonempty().rev().copied().collect();
    reversed.reverse();
    prop_assert_eq!(&reversed, &expected_values);

    Ok(())
}

proptest! {
    #[test]
    fn test_table_matches_model(
        len in 0..400usize,
        ops in prop::collection::vec(op(), 0..200),
    ) {
        let (table, model, len) = run::<48>(len, &ops);
        check_against_model(&table, &model, len)?;
    }

    #[test]
    fn test_small_groups_match_model(
        len in 0..100usize,
        ops in prop::collection::vec(op(), 0..100),
    ) {
        let (table, model, len) = run::<5>(len, &ops);
        check_against_model(&table, &model, len)?;
    }

    #[test]
    fn test_rank_select(
        indices in prop::collection::btree_set(0..1000usize, 0..100),
    ) {
        let mut table = SparseTable::<u8>::with_len(1000);
        for &i in &indices {
            table.set(i, 1);
        }

        for (k, &i) in indices.iter().enumerate() {
            prop_assert_eq!(table.select(k), Some(i));
            prop_assert_eq!(table.rank(i), k);
            prop_assert_eq!(table.get_pos(table.get_iter(i).pos().unwrap()), i);
        }
        prop_assert_eq!(table.select(indices.len()), None);
        prop_assert_eq!(table.rank(1000), indices.len());
    }

    #[test]
    fn test_meeting_iterators(
        indices in prop::collection::btree_set(0..300usize, 0..60),
        pattern in prop::collection::vec(any::<bool>(), 0..80),
    ) {
        let mut table = SparseTable::<usize>::with_len(300);
        for &i in &indices {
            table.set(i, i);
        }

        let mut expected: VecDeque<_> = indices.iter().copied().collect();
        let mut iter = table.nonempty();
        for from_back in pattern {
            if from_back {
                prop_assert_eq!(iter.next_back().copied(), expected.pop_back());
            } else {
                prop_assert_eq!(iter.next().copied(), expected.pop_front());
            }
        }
    }

    #[test]
    fn test_drain_order(
        indices in prop::collection::btree_set(0..500usize, 0..80),
        take in 0..100usize,
    ) {
        let mut table = SparseTable::<String>::with_len(500);
        for &i in &indices {
            table.set(i, i.to_string());
        }

        let drained: Vec<_> = table.drain().take(take).collect();
        let expected: Vec<_> = indices.iter().take(take).map(|i| i.to_string()).collect();
        prop_assert_eq!(drained, expected);
        prop_assert_eq!(table.num_nonempty(), 0);
        prop_assert_eq!(table.len(), 500);
    }
}
