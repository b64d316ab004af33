//! Transient batch editor: owner-token in-place mutation semantics.

use crate::ChampMap;

#[test]
fn finish_produces_equivalent_map() {
    let base = ChampMap::new().set(1, 10).set(2, 20);

    let mut mutation = base.mutate();
    mutation.set(3, 30);
    let result = mutation.finish();

    assert_eq!(result.len(), 3);
    assert_eq!(*result.get(&1).unwrap(), 10);
    assert_eq!(*result.get(&2).unwrap(), 20);
    assert_eq!(*result.get(&3).unwrap(), 30);
}

#[test]
fn source_map_unaffected_while_mutation_is_open() {
    let base = ChampMap::new().set(1, 10);

    let mut mutation = base.mutate();
    mutation.set(2, 20);

    assert_eq!(base.len(), 1);
    assert!(base.get(&2).is_none());
    assert_eq!(mutation.len(), 2);
    assert_eq!(mutation.get(&2), Some(20));
}

#[test]
fn repeated_set_on_same_key_does_not_grow_len() {
    let base: ChampMap<i32, i32> = ChampMap::new();
    let mut mutation = base.mutate();
    mutation.set(1, 10);
    mutation.set(1, 20);
    mutation.set(1, 30);
    assert_eq!(mutation.len(), 1);
    assert_eq!(mutation.get(&1), Some(30));

    let result = mutation.finish();
    assert_eq!(result.len(), 1);
    assert_eq!(*result.get(&1).unwrap(), 30);
}

#[test]
fn remove_within_mutation() {
    let base = ChampMap::new().set(1, 10).set(2, 20).set(3, 30);
    let mut mutation = base.mutate();

    assert_eq!(mutation.remove(&2), Some(20));
    assert_eq!(mutation.remove(&2), None);
    assert_eq!(mutation.len(), 2);

    let result = mutation.finish();
    assert_eq!(result.len(), 2);
    assert!(result.get(&2).is_none());
    assert_eq!(*result.get(&1).unwrap(), 10);
    assert_eq!(*result.get(&3).unwrap(), 30);
}

#[test]
fn set_identical_value_within_mutation_is_a_no_op() {
    let base = ChampMap::new().set(1, 10).set(2, 20).set(3, 30);
    let before = base.arena_len();

    let mut mutation = base.mutate();
    mutation.set(2, 20);
    assert_eq!(mutation.len(), 3);

    let result = mutation.finish();
    assert_eq!(result.arena_len(), before, "no allocation should occur");
    assert_eq!(result, base);
}

#[test]
fn update_applies_last_write_wins() {
    let base = ChampMap::new().set(1, 10);
    let mut mutation = base.mutate();
    mutation.update(vec![(1, 100), (2, 20), (1, 999)]);

    assert_eq!(mutation.get(&1), Some(999));
    assert_eq!(mutation.get(&2), Some(20));

    let result = mutation.finish();
    assert_eq!(result.len(), 2);
}

#[test]
fn many_edits_in_one_mutation_match_sequential_sets() {
    let base: ChampMap<u64, u64> = ChampMap::new();

    let mut mutation = base.mutate();
    for i in 0..500 {
        mutation.set(i, i * 2);
    }
    for i in (0..500).step_by(3) {
        mutation.remove(&i);
    }
    let batched = mutation.finish();

    let mut sequential: ChampMap<u64, u64> = ChampMap::new();
    for i in 0..500 {
        sequential = sequential.set(i, i * 2);
    }
    for i in (0..500).step_by(3) {
        sequential = sequential.delete(&i).expect("key is present");
    }

    assert_eq!(batched.len(), sequential.len());
    assert_eq!(batched.adhash(), sequential.adhash());
    assert_eq!(batched, sequential);
}

#[test]
fn finish_consumes_the_mutation() {
    let base = ChampMap::new().set(1, 10);
    let mutation = base.mutate();
    let result = mutation.finish();
    // `mutation` is gone; only the finished map is usable from here on.
    assert_eq!(result.len(), 1);
}

#[test]
fn multiple_mutations_from_the_same_source_stay_independent() {
    let base = ChampMap::new().set(1, 10);

    let mut m_a = base.mutate();
    m_a.set(2, 20);

    let mut m_b = base.mutate();
    m_b.set(3, 30);

    let a = m_a.finish();
    let b = m_b.finish();

    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.get(&3).is_none());
    assert!(b.get(&2).is_none());
    assert_eq!(base.len(), 1);
}
