//! Multi-threaded, persistent CHAMP map.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use safe_bump::Idx;

use crate::adhash;
use crate::arena_sync::ChampArenaSync;
use crate::error::ChampError;
use crate::iter::OwnedIter;
use crate::mutation_sync::ChampMapMutationSync;
use crate::node::{self, Entry, Node, NO_OWNER};
use crate::ops::get::get_recursive;
use crate::ops::insert::insert_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::store::ChampStore;

/// Persistent hash map based on a CHAMP trie, multi-threaded.
///
/// Identical design to [`ChampMap`](crate::ChampMap) but backed by
/// [`SharedArena`](safe_bump::SharedArena) wrapped in `Arc<Mutex<_>>` for
/// `Send + Sync` support across threads.
pub struct ChampMapSync<K, V> {
    store: Arc<Mutex<ChampArenaSync<K, V>>>,
    root: Option<Idx<Node<K, V>>>,
    size: usize,
    adhash: u64,
}

impl<K, V> Clone for ChampMapSync<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            root: self.root,
            size: self.size,
            adhash: self.adhash,
        }
    }
}

// ---------------------------------------------------------------------------
// Construction & accessors — no trait bounds
// ---------------------------------------------------------------------------

impl<K, V> ChampMapSync<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(ChampArenaSync::new())),
            root: None,
            size: 0,
            adhash: 0,
        }
    }

    pub(crate) const fn from_parts(
        store: Arc<Mutex<ChampArenaSync<K, V>>>,
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
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        self.adhash
    }

    /// Returns the total number of allocated items in the shared arena:
    /// `(nodes, entries, children)`.
    #[must_use]
    pub fn arena_len(&self) -> (usize, usize, usize) {
        self.store.lock().expect("champ-map mutex poisoned").arena_len()
    }
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

impl<K: Hash + Eq, V> ChampMapSync<K, V> {
    /// Returns a clone of the value associated with `key`, if present.
    ///
    /// Returns an owned clone rather than a reference: `std::sync::Mutex`
    /// has no `RefCell`-style `filter_map` to thread a borrow safely back
    /// out through the guard, so a value obtained from behind the lock must
    /// be copied out before the lock is released.
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

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool
    where
        V: Clone,
    {
        self.get(key).is_some()
    }
}

// ---------------------------------------------------------------------------
// Persistent write operations
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> ChampMapSync<K, V> {
    /// Returns a new map with `key` associated to `value`. `self` is
    /// unchanged. If `key` already maps to a value equal to `value`, returns
    /// a map sharing its entire arena and root with `self` — no allocation
    /// occurs.
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
    /// Returns [`ChampError::NotFound`] if `key` is not present.
    pub fn delete(&self, key: &K) -> Result<Self, ChampError<K>> {
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
    pub fn mutate(&self) -> ChampMapMutationSync<K, V> {
        let owner = self
            .store
            .lock()
            .expect("champ-map mutex poisoned")
            .fresh_owner();
        ChampMapMutationSync::new(Arc::clone(&self.store), self.root, self.size, self.adhash, owner)
    }

    /// Inserts a key-value pair in place. Returns `None` if the key was new,
    /// or `Some(old_value)` if an existing value was replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let old = self.get(&key);
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
        let mut store = self.store.lock().expect("champ-map mutex poisoned");

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
        let old_value = self.get(key)?;
        let mut store = self.store.lock().expect("champ-map mutex poisoned");
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
// Iteration
// ---------------------------------------------------------------------------

impl<K: Clone, V: Clone> ChampMapSync<K, V> {
    /// Returns an iterator over `(K, V)` pairs.
    #[must_use]
    pub fn iter(&self) -> OwnedIter<K, V> {
        let store = self.store.lock().expect("champ-map mutex poisoned");
        OwnedIter::new(&*store, self.root)
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V> Default for ChampMapSync<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for ChampMapSync<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChampMapSync")
            .field("len", &self.size)
            .field("adhash", &format_args!("{:#018x}", self.adhash))
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> Extend<(K, V)> for ChampMapSync<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> FromIterator<(K, V)> for ChampMapSync<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> PartialEq for ChampMapSync<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        if Arc::ptr_eq(&self.store, &other.store) && self.root == other.root {
            return true;
        }
        if self.adhash != other.adhash {
            return false;
        }
        self.iter().all(|(k, v)| other.get(&k).is_some_and(|ov| ov == v))
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + Eq> Eq for ChampMapSync<K, V> {}

impl<K, V> Hash for ChampMapSync<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.adhash.hash(state);
    }
}

impl<K: Clone, V: Clone> IntoIterator for &ChampMapSync<K, V> {
    type Item = (K, V);
    type IntoIter = OwnedIter<K, V>;

    fn into_iter(self) -> OwnedIter<K, V> {
        self.iter()
    }
}
