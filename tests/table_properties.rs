use std::panic::{self, AssertUnwindSafe};

use sparse_table::{SparseTable, DEFAULT_GROUP_SIZE};

const G: usize = DEFAULT_GROUP_SIZE;

#[test]
fn test_tracks_assignment() {
    let mut table = SparseTable::<i32>::with_len(3 * G);

    for index in 0..table.len() {
        assert!(!table.test(index));
        table.set(index, -1);
        assert!(table.test(index));
        table.erase(index);
        assert!(!table.test(index));
    }

    assert_eq!(table.num_nonempty(), 0);
}

#[test]
fn shrink_then_grow_does_not_resurrect() {
    let mut table = SparseTable::<u32>::with_len(100);
    table.set(80, 8);

    table.resize(50);
    assert_eq!(table.num_nonempty(), 0);
    let out_of_range = panic::catch_unwind(AssertUnwindSafe(|| table.test(80)));
    assert!(out_of_range.is_err());

    table.resize(100);
    assert!(!table.test(80));
    assert_eq!(table[80], 0);
}

#[test]
fn traversal_across_group_boundary() {
    let mut table = SparseTable::<usize>::with_len(2 * G);
    table.set(G, G);
    table.set(G - 1, G - 1);

    let values: Vec<_> = table.nonempty().copied().collect();
    assert_eq!(values, [G - 1, G]);

    let indexed: Vec<_> = table.indexed().map(|(i, _)| i).collect();
    assert_eq!(indexed, [G - 1, G]);
}

#[test]
fn traversal_of_unassigned_table() {
    let table = SparseTable::<usize>::with_len(10 * G);
    assert_eq!(table.nonempty().count(), 0);
    assert_eq!(table.indexed().count(), 0);
    assert_eq!(table.iter().filter(|&&v| v != 0).count(), 0);
}

#[test]
fn traversal_of_full_table() {
    let len = 3 * G + 7;
    let mut table = SparseTable::<usize>::with_len(len);
    for index in (0..len).rev() {
        table.set(index, index);
    }

    assert_eq!(table.num_nonempty(), len);
    assert!(table.nonempty().copied().eq(0..len));
    assert!(table.nonempty().rev().copied().eq((0..len).rev()));
    assert!(table.iter().copied().eq(0..len));
}

#[test]
fn explicit_default_is_observable_only_through_test() {
    let mut table = SparseTable::<String>::with_len(4);
    table.set(1, String::new());

    assert_eq!(table[1], table[2]);
    assert!(table.test(1));
    assert!(!table.test(2));
    assert_eq!(table.num_nonempty(), 1);
}

#[test]
fn erase_twice_is_noop() {
    let mut table = SparseTable::<u8>::with_len(10);
    table.set(2, 2);

    assert_eq!(table.erase(7), None);
    assert_eq!(table.erase(7), None);
    assert_eq!(table.num_nonempty(), 1);

    assert_eq!(table.erase(2), Some(2));
    assert_eq!(table.erase(2), None);
    assert_eq!(table.num_nonempty(), 0);
}

#[test]
fn drop_glue_values_are_released() {
    use std::rc::Rc;

    let shared = Rc::new(());
    let mut table = SparseTable::<Option<Rc<()>>>::with_len(200);
    for index in (0..200).step_by(3) {
        table.set(index, Some(shared.clone()));
    }
    assert_eq!(Rc::strong_count(&shared), 68);

    table.erase_range(0..100);
    assert_eq!(Rc::strong_count(&shared), 68 - 34);

    table.resize(150);
    assert_eq!(Rc::strong_count(&shared), 68 - 34 - 17);

    drop(table);
    assert_eq!(Rc::strong_count(&shared), 1);
}

#[test]
fn small_group_size() {
    let mut table = SparseTable::<u16, 8>::with_len(30);
    for index in [0, 7, 8, 15, 29] {
        table.set(index, index as u16);
    }

    assert_eq!(table.groups().len(), 4);
    assert!(table.nonempty().copied().eq([0, 7, 8, 15, 29]));
    assert_eq!(table.rank(16), 4);
    assert_eq!(table.select(4), Some(29));
}
