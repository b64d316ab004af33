//! Error types for operations that can fail on a missing key.

use std::error::Error;
use std::fmt;

/// Failure mode for a [`ChampMap`](crate::ChampMap)/[`ChampMapMutation`](crate::ChampMapMutation)
/// operation.
///
/// The dynamically-typed original this crate is a port of also has
/// `TypeMismatch`, `UpdateElementShape`, `Unhashable`, `NotIterable`, and
/// `UserCallbackFailure` kinds; none of those can occur in a statically
/// typed Rust port (the compiler rejects the ill-typed calls that would
/// produce them), so this enum has a single variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChampError<K> {
    /// A lookup or delete was attempted on a key not present in the map.
    NotFound(K),
}

impl<K: fmt::Debug> fmt::Display for ChampError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "key not found: {key:?}"),
        }
    }
}

impl<K: fmt::Debug> Error for ChampError<K> {}
