//! Transient batch editor for [`ChampMapSync`](crate::ChampMapSync), multi-threaded.

use std::hash::Hash;
use std::sync::{Arc, Mutex};

use safe_bump::Idx;

use crate::adhash;
use crate::arena_sync::ChampArenaSync;
use crate::map_sync::ChampMapSync;
use crate::node::{self, Entry, Node};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::store::ChampStore;

/// Thread-safe counterpart of [`ChampMapMutation`](crate::ChampMapMutation).
///
/// See that type's documentation for the owner-token in-place mutation
/// protocol; this type is identical except for using
/// [`Arc<Mutex<_>>`](Mutex) instead of `Rc<RefCell<_>>`, so the handle and
/// the shared arena it points into are `Send + Sync`.
pub struct ChampMapMutationSync<K, V> {
    store: Arc<Mutex<ChampArenaSync<K, V>>>,
    root: Option<Idx<Node<K, V>>>,
    size: usize,
    adhash: u64,
    owner: u64,
}

impl<K, V> ChampMapMutationSync<K, V> {
    pub(crate) fn new(
        store: Arc<Mutex<ChampArenaSync<K, V>>>,
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

impl<K: Hash + Eq, V> ChampMapMutationSync<K, V> {
    /// Returns a clone of the value associated with `key`, if present.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let root = self.root?;
        let hash = adhash::hash_one(key);
        let store = self.store.lock().expect("champ-map mutex poisoned");
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

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> ChampMapMutationSync<K, V> {
    /// Stages an insert or update for `key`. A no-op if `key` already maps
    /// to a value equal to `value`.
    pub fn set(&mut self, key: K, value: V) -> &mut Self {
        let hash = adhash::hash_one(&key);
        let entry = Entry { hash, key, value };
        let mut store = self.store.lock().expect("champ-map mutex poisoned");

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
        let mut store = self.store.lock().expect("champ-map mutex poisoned");
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

    /// Consumes the transient, returning a fresh persistent
    /// [`ChampMapSync`] over the shared arena.
    #[must_use]
    pub fn finish(self) -> ChampMapSync<K, V> {
        ChampMapSync::from_parts(self.store, self.root, self.size, self.adhash)
    }
}
