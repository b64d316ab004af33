//! Persistent hash map based on CHAMP.
//!
//! CHAMP (Compressed Hash-Array Mapped Prefix-tree) is a refined HAMT that
//! guarantees **canonical form**: the same set of key-value pairs always
//! produces the same trie structure, regardless of insertion order. Every
//! `set`/`delete`/`update` call returns a new logical version of the map
//! while sharing as much of the old trie's storage as possible.
//!
//! # Key properties
//!
//! - **Canonical form**: same contents = same structure
//! - **O(1) structural equality**: via incrementally maintained `AdHash`
//! - **COW structural sharing**: cheap copy, mutate-on-write
//! - **Transient batch edits**: [`ChampMap::mutate`] amortizes a run of
//!   edits into owner-tagged in-place mutation, then [`finish`](mutation::ChampMapMutation::finish)s
//!   back into a persistent value
//! - **Zero `unsafe`**: enforced by `#![forbid(unsafe_code)]`
//!
//! # References
//!
//! - Steindorfer & Vinju, 2015 — "Optimizing Hash-Array Mapped Tries
//!   for Fast and Lean Immutable JVM Collections", OOPSLA 2015
//! - Bagwell, 2001 — "Ideal Hash Trees"

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod adhash;
pub mod error;
pub mod iter;
pub mod mutation;
pub mod mutation_sync;
pub mod node;
pub mod store;

mod arena;
mod arena_sync;
mod map;
mod map_sync;
mod ops;

#[cfg(test)]
mod tests;

pub use error::ChampError;
pub use map::ChampMap;
pub use map_sync::ChampMapSync;
pub use mutation::ChampMapMutation;
pub use mutation_sync::ChampMapMutationSync;
