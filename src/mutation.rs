//! Transient batch editor for [`ChampMap`](crate::ChampMap), single-threaded.

use std::cell::RefCell;
use std::rc::Rc;

use safe_bump::Idx;

use crate::adhash;
use crate::arena::ChampArena;
use crate::map::ChampMap;
use crate::node::{self, Entry, Node};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::store::ChampStore;
use std::hash::Hash;

/// A batch of edits against the shared arena behind a [`ChampMap`], applied
/// in place where safe and finished back into a fresh persistent handle.
///
/// Every node this transient creates or overwrites is tagged with a single
/// owner token issued when the transient was opened. A node may be mutated
/// in place only if it already carries that exact token; any node still
/// reachable from another `ChampMap`/transient is copy-on-write cloned, just
/// as it would be on the fully persistent path. This means the arena always
/// stays consistent for every other live handle, transient or not.
///
/// Dropping a `ChampMapMutation` without calling [`finish`](Self::finish) is
/// safe: the `ChampMap` this transient was opened from never had its root
/// pointer changed, so it is completely unaffected, and whatever nodes the
/// transient wrote become unreachable garbage in the shared arena.
pub struct ChampMapMutation<K, V> {
    store: Rc<RefCell<ChampArena<K, V>>>,
    root: Option<Idx<Node<K, V>>>,
    size: usize,
    adhash: u64,
    owner: u64,
}

impl<K, V> ChampMapMutation<K, V> {
    pub(crate) fn new(
        store: Rc<RefCell<ChampArena<K, V>>>,
        root: Option<Idx<Node<K, V>>>,
        size: usize,
        adhash: u64,
        owner: u64,
    ) -> Self {
        Self { store, root, size, adhash, owner }
    }

    /// Returns the number of key-value pairs currently staged.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no entries are staged.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl<K: Hash + Eq, V> ChampMapMutation<K, V> {
    /// Returns `true` if the given key is present in the staged contents.
    ///
    /// Clones the value out of the shared arena (it cannot borrow across a
    /// `RefCell` access the way a plain reference would).
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let root = self.root?;
        let hash = adhash::hash_one(key);
        let store = self.store.borrow();
        get_recursive(&*store, root, hash, key, 0).cloned()
    }

    /// Returns `true` if the staged contents contain `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool
    where
        V: Clone,
    {
        self.get(key).is_some()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> ChampMapMutation<K, V> {
    /// Stages an insert or update for `key`. A no-op if `key` already maps
    /// to a value equal to `value`.
    pub fn set(&mut self, key: K, value: V) -> &mut Self {
        let hash = adhash::hash_one(&key);
        let entry = Entry { hash, key, value };
        let mut store = self.store.borrow_mut();

        if let Some(root) = self.root {
            let outcome = insert_recursive(&mut *store, root, entry, 0, self.owner);
            drop(store);
            self.root = Some(outcome.node);
            self.adhash = self.adhash.wrapping_add(outcome.adhash_delta);
            if outcome.inserted {
                self.size += 1;
            }
        } else {
            let value_hash = adhash::hash_one(&entry.value);
            let contribution = adhash::entry_adhash(hash, value_hash);
            let frag = node::fragment(hash, 0);
            let bit = node::mask(frag);
            let data_start = store
                .alloc_entries(std::iter::once(entry))
                .expect("single entry");
            let new_node = store.alloc_node(Node::Inner {
                data_map: bit,
                node_map: 0,
                data_start,
                children_start: Idx::from_raw(0),
                adhash: contribution,
                owner: self.owner,
            });
            drop(store);
            self.root = Some(new_node);
            self.size = 1;
            self.adhash = contribution;
        }
        self
    }

    /// Stages a removal of `key`. Returns the removed value, or `None` if
    /// the key was not present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let root = self.root?;
        let old_value = self.get(key)?;
        let hash = adhash::hash_one(key);
        let mut store = self.store.borrow_mut();
        match remove_recursive(&mut *store, root, hash, key, 0, self.owner) {
            RemoveOutcome::NotFound => None,
            RemoveOutcome::Removed { node, adhash_delta } => {
                drop(store);
                self.root = node;
                self.size -= 1;
                self.adhash = self.adhash.wrapping_sub(adhash_delta);
                Some(old_value)
            }
        }
    }

    /// Applies every `(key, value)` pair from `other` in order, last write
    /// wins.
    pub fn update(&mut self, other: impl IntoIterator<Item = (K, V)>) {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    /// Consumes the transient, returning a fresh persistent [`ChampMap`]
    /// over the shared arena.
    ///
    /// Taking `self` by value makes "finish called twice" and "edit after
    /// finish" compile errors rather than runtime ones.
    #[must_use]
    pub fn finish(self) -> ChampMap<K, V> {
        ChampMap::from_parts(self.store, self.root, self.size, self.adhash)
    }
}
