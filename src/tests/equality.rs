//! `PartialEq`, `Eq`, and `Hash` across both map types.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::{ChampMap, ChampMapSync};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn equal_maps_built_in_different_orders() {
    let a = ChampMap::new().set(1, 10).set(2, 20).set(3, 30);
    let b = ChampMap::new().set(3, 30).set(1, 10).set(2, 20);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn maps_differing_by_one_value_are_unequal() {
    let a = ChampMap::new().set(1, 10).set(2, 20);
    let b = ChampMap::new().set(1, 10).set(2, 21);
    assert_ne!(a, b);
}

#[test]
fn maps_differing_by_length_are_unequal() {
    let a = ChampMap::new().set(1, 10);
    let b = ChampMap::new().set(1, 10).set(2, 20);
    assert_ne!(a, b);
}

#[test]
fn empty_maps_are_equal() {
    let a: ChampMap<i32, i32> = ChampMap::new();
    let b: ChampMap<i32, i32> = ChampMap::new();
    assert_eq!(a, b);
}

#[test]
fn clone_is_equal_to_its_source() {
    let a = ChampMap::new().set("x", 1).set("y", 2);
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(a.adhash(), b.adhash());
}

#[test]
fn shared_ancestor_versions_compare_by_contents_not_identity() {
    let base = ChampMap::new().set(1, 10);
    let a = base.set(2, 20);
    let b = base.set(2, 20);
    assert_eq!(a, b);
    assert_ne!(a, base);
}

#[test]
fn sync_equal_maps_built_in_different_orders() {
    let a = ChampMapSync::new().set(1, 10).set(2, 20).set(3, 30);
    let b = ChampMapSync::new().set(3, 30).set(1, 10).set(2, 20);
    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn sync_maps_differing_by_one_value_are_unequal() {
    let a = ChampMapSync::new().set(1, 10);
    let b = ChampMapSync::new().set(1, 11);
    assert_ne!(a, b);
}

#[test]
fn deleted_then_reinserted_key_restores_equality() {
    let a = ChampMap::new().set(1, 10).set(2, 20);
    let b = a.delete(&2).unwrap().set(2, 20);
    assert_eq!(a, b);
}

/// Associating a key to a value equal to the one already stored there is a
/// no-op: no allocation happens, and the resulting map shares its entire
/// arena and root with the source.
#[test]
fn set_identical_value_is_a_no_op() {
    let a = ChampMap::new().set(1, 10).set(2, 20).set(3, 30);
    let before = a.arena_len();

    let b = a.set(2, 20);

    assert_eq!(a.arena_len(), before, "no allocation should occur");
    assert_eq!(b.arena_len(), before);
    assert_eq!(a.adhash(), b.adhash());
    assert_eq!(a, b);
}

/// The no-op short-circuit propagates through nested inner nodes, not just
/// a single-level leaf: re-`set`ing many keys to their existing values
/// leaves the whole trie's allocations untouched.
#[test]
fn set_identical_values_across_many_keys_allocates_nothing() {
    let mut a: ChampMap<u64, u64> = ChampMap::new();
    for i in 0..500 {
        a = a.set(i, i * 7);
    }
    let before = a.arena_len();

    let mut b = a.clone();
    for i in 0..500 {
        b = b.set(i, i * 7);
    }

    assert_eq!(b.arena_len(), before);
    assert_eq!(a, b);
}

#[test]
fn sync_set_identical_value_is_a_no_op() {
    let a = ChampMapSync::new().set(1, 10).set(2, 20);
    let before = a.arena_len();

    let b = a.set(2, 20);

    assert_eq!(b.arena_len(), before);
    assert_eq!(a, b);
}
