//! Single-threaded, persistent CHAMP map.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use safe_bump::Idx;

use crate::adhash;
use crate::arena::ChampArena;
use crate::error::ChampError;
use crate::iter::{Iter, OwnedIter};
use crate::mutation::ChampMapMutation;
use crate::node::{self, Entry, Node, NO_OWNER};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::store::ChampStore;

/// Persistent hash map based on a CHAMP trie, single-threaded.
///
/// Same set of key-value pairs always produces the same trie structure
/// (canonical form), enabling O(1) structural equality via [`adhash`](Self::adhash).
/// Cloning a `ChampMap` (via [`set`](Self::set), [`delete`](Self::delete), or
/// `#[derive(Clone)]`) is cheap: the underlying arena is shared through an
/// `Rc<RefCell<_>>`, and old handles remain valid forever.
pub struct ChampMap<K, V> {
    store: Rc<RefCell<ChampArena<K, V>>>,
    root: Option<Idx<Node<K, V>>>,
    size: usize,
    adhash: u64,
}

impl<K, V> Clone for ChampMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            root: self.root,
            size: self.size,
            adhash: self.adhash,
        }
    }
}

// ---------------------------------------------------------------------------
// Construction & accessors — no trait bounds
// ---------------------------------------------------------------------------

impl<K, V> ChampMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(ChampArena::new())),
            root: None,
            size: 0,
            adhash: 0,
        }
    }

    /// Builds a map directly from its parts. Used by
    /// [`ChampMapMutation::finish`](crate::mutation::ChampMapMutation::finish)
    /// to hand a shared arena back over as a persistent handle.
    pub(crate) const fn from_parts(
        store: Rc<RefCell<ChampArena<K, V>>>,
        root: Option<Idx<Node<K, V>>>,
        size: usize,
        adhash: u64,
    ) -> Self {
        Self { store, root, size, adhash }
    }

    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the current `AdHash` value.
    ///
    /// Two maps with the same `AdHash` and the same length contain the same
    /// entries with overwhelming probability (2⁻⁶⁴ collision chance).
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        self.adhash
    }

    /// Returns the total number of allocated items in the shared arena:
    /// `(nodes, entries, children)`.
    ///
    /// Includes dead COW copies from this and every sibling version —
    /// reflects true memory footprint of the shared store.
    #[must_use]
    pub fn arena_len(&self) -> (usize, usize, usize) {
        self.store.borrow().arena_len()
    }
}

// ---------------------------------------------------------------------------
// Read operations — K: Hash + Eq
// ---------------------------------------------------------------------------

impl<K: Hash + Eq, V> ChampMap<K, V> {
    /// Returns a guard dereferencing to the value associated with `key`.
    ///
    /// Returns a [`Ref`] rather than a bare `&V` because the backing arena
    /// is shared via `RefCell` across every version of this map.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Ref<'_, V>> {
        let root = self.root?;
        let hash = adhash::hash_one(key);
        let store = self.store.borrow();
        Ref::filter_map(store, |s| get_recursive(s, root, hash, key, 0)).ok()
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

// ---------------------------------------------------------------------------
// Persistent write operations — K: Hash + Eq + Clone, V: Hash + Clone + PartialEq
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> ChampMap<K, V> {
    /// Returns a new map with `key` associated to `value`.
    ///
    /// `self` is left completely unchanged; the returned map shares every
    /// unaffected subtree with `self` through the common arena. If `key`
    /// already maps to a value equal to `value`, returns a map that shares
    /// its entire arena and root with `self` — no allocation occurs.
    #[must_use]
    pub fn set(&self, key: K, value: V) -> Self {
        let mut next = self.clone();
        next.insert_persistent(key, value);
        next
    }

    /// Returns a new map with `key` removed.
    ///
    /// # Errors
    ///
    /// Returns [`ChampError::NotFound`] if `key` is not present. `self` is
    /// unchanged either way.
    pub fn delete(&self, key: &K) -> Result<Self, ChampError<K>>
    where
        K: Clone,
    {
        let mut next = self.clone();
        if next.remove_persistent(key).is_some() {
            Ok(next)
        } else {
            Err(ChampError::NotFound(key.clone()))
        }
    }

    /// Applies every `(key, value)` pair from `other` in order, last write
    /// wins, and returns the resulting map. `self` is unchanged.
    #[must_use]
    pub fn update(&self, other: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut mutation = self.mutate();
        for (k, v) in other {
            mutation.set(k, v);
        }
        mutation.finish()
    }

    /// Opens a transient batch editor over this map's current contents.
    #[must_use]
    pub fn mutate(&self) -> ChampMapMutation<K, V> {
        let owner = self.store.borrow_mut().fresh_owner();
        ChampMapMutation::new(Rc::clone(&self.store), self.root, self.size, self.adhash, owner)
    }

    /// Inserts a key-value pair in place. Returns `None` if the key was new,
    /// or `Some(old_value)` if an existing value was replaced.
    ///
    /// Mutates this handle directly — other `ChampMap` handles sharing the
    /// same arena are unaffected, since the inserted nodes are tagged
    /// [`NO_OWNER`] and therefore always copy-on-write.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.get(&key).map(|v| (*v).clone());
        self.insert_persistent(key, value);
        old
    }

    /// Removes a key in place. Returns the removed value, or `None` if the
    /// key was not present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_persistent(key)
    }

    fn insert_persistent(&mut self, key: K, value: V) {
        let hash = adhash::hash_one(&key);
        let entry = Entry { hash, key, value };
        let mut store = self.store.borrow_mut();

        if let Some(root) = self.root {
            let outcome = insert_recursive(&mut *store, root, entry, 0, NO_OWNER);
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
                owner: NO_OWNER,
            });
            self.root = Some(new_node);
            self.size = 1;
            self.adhash = contribution;
        }
    }

    fn remove_persistent(&mut self, key: &K) -> Option<V> {
        let root = self.root?;
        let hash = adhash::hash_one(key);
        let old_value = self.get(key).map(|v| (*v).clone())?;
        let mut store = self.store.borrow_mut();
        match remove_recursive(&mut *store, root, hash, key, 0, NO_OWNER) {
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
}

// ---------------------------------------------------------------------------
// Iteration — snapshot clone, decoupled from the `RefCell` borrow
// ---------------------------------------------------------------------------

impl<K: Clone, V: Clone> ChampMap<K, V> {
    /// Returns an iterator over `(K, V)` pairs.
    ///
    /// Collects a cloned snapshot at call time rather than borrowing the
    /// shared arena for the iterator's lifetime.
    #[must_use]
    pub fn iter(&self) -> OwnedIter<K, V> {
        let store = self.store.borrow();
        OwnedIter::new(&*store, self.root)
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V> Default for ChampMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ChampMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChampMap")
            .field("len", &self.size)
            .field("adhash", &format_args!("{:#018x}", self.adhash))
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> Extend<(K, V)> for ChampMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> FromIterator<(K, V)> for ChampMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> PartialEq for ChampMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        if Rc::ptr_eq(&self.store, &other.store) && self.root == other.root {
            return true;
        }
        if self.adhash != other.adhash {
            return false;
        }
        let store = self.store.borrow();
        let Some(root) = self.root else {
            return other.root.is_none();
        };
        Iter::new(&*store, Some(root)).all(|(k, v)| other.get(k).is_some_and(|ov| *ov == *v))
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + Eq> Eq for ChampMap<K, V> {}

impl<K, V> Hash for ChampMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.adhash.hash(state);
    }
}

impl<K: Clone, V: Clone> IntoIterator for &ChampMap<K, V> {
    type Item = (K, V);
    type IntoIter = OwnedIter<K, V>;

    fn into_iter(self) -> OwnedIter<K, V> {
        self.iter()
    }
}
