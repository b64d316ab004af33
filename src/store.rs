//! Storage abstraction for CHAMP trie operations.

use safe_bump::Idx;

use crate::node::{Entry, Node};

/// Storage backend for CHAMP operations.
///
/// Abstracts over [`Arena`](safe_bump::Arena) (single-thread) and
/// [`SharedArena`](safe_bump::SharedArena) (multi-thread) backends.
///
/// Arenas are append-only: nothing is ever freed or shrunk, which is what
/// lets multiple [`ChampMap`](crate::ChampMap) values generated from the
/// same store stay valid simultaneously. The `*_mut` accessors below do not
/// violate that — they overwrite an already-allocated, fixed-size cell in
/// place, which is only sound when the caller (the transient batch editor)
/// has already established that no other live handle can observe the
/// node being overwritten.
pub trait ChampStore<K, V> {
    /// Allocates a single node, returning its index.
    fn alloc_node(&mut self, node: Node<K, V>) -> Idx<Node<K, V>>;

    /// Returns a reference to the node at `idx`.
    fn get_node(&self, idx: Idx<Node<K, V>>) -> &Node<K, V>;

    /// Returns a mutable reference to the node at `idx`.
    ///
    /// Used by the transient batch editor to overwrite a node it already
    /// owns instead of copy-on-write cloning it.
    fn get_node_mut(&mut self, idx: Idx<Node<K, V>>) -> &mut Node<K, V>;

    /// Allocates a contiguous block of entries, returning the index of the
    /// first one. Returns `None` if the iterator is empty.
    fn alloc_entries(
        &mut self,
        iter: impl IntoIterator<Item = Entry<K, V>>,
    ) -> Option<Idx<Entry<K, V>>>;

    /// Returns a reference to the entry at `idx`.
    fn get_entry(&self, idx: Idx<Entry<K, V>>) -> &Entry<K, V>;

    /// Returns a mutable reference to the entry at `idx`.
    fn get_entry_mut(&mut self, idx: Idx<Entry<K, V>>) -> &mut Entry<K, V>;

    /// Allocates a contiguous block of child node indices, returning the
    /// index of the first one. Returns `None` if the iterator is empty.
    fn alloc_children(
        &mut self,
        iter: impl IntoIterator<Item = Idx<Node<K, V>>>,
    ) -> Option<Idx<Idx<Node<K, V>>>>;

    /// Returns a reference to the child index at `idx`.
    fn get_child(&self, idx: Idx<Idx<Node<K, V>>>) -> &Idx<Node<K, V>>;

    /// Returns a mutable reference to the child index at `idx`.
    fn get_child_mut(&mut self, idx: Idx<Idx<Node<K, V>>>) -> &mut Idx<Node<K, V>>;

    /// Returns the total number of allocated items in each arena:
    /// `(nodes, entries, children)`.
    ///
    /// Includes dead COW copies — reflects true memory footprint.
    fn arena_len(&self) -> (usize, usize, usize);

    /// Mints a fresh, globally unique owner token for a new transient.
    ///
    /// Never returns [`NO_OWNER`](crate::node::NO_OWNER).
    fn fresh_owner(&mut self) -> u64;
}
