//! Inverted index access.
//!
//! The index maps string keys (a namespace followed by a word) to sets of
//! record ids. Filtering only ever reads it through [`IndexStore`], so any
//! backend that can answer the three calls below can serve a filter.

mod duck;
mod memory;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::Result;

pub use duck::DuckIndex;
pub(crate) use duck::{clear_prefix, insert_members};
pub use memory::MemoryIndex;

/// A set of record identifiers.
pub type IdSet = BTreeSet<i64>;

/// Read capabilities a filter needs from an index backend.
///
/// Implementations must tolerate concurrent calls: resolving a query may
/// issue several lookups at once from different threads.
pub trait IndexStore: Send + Sync {
    /// Ids stored under exactly `key`. Empty when the key is absent.
    fn exact_members(&self, key: &str) -> Result<IdSet>;

    /// Every stored key that starts with `prefix`, in ascending order.
    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Union of the sets stored under `keys`. Empty for an empty slice.
    fn union_members(&self, keys: &[String]) -> Result<IdSet>;
}

impl<I: IndexStore + ?Sized> IndexStore for &I {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        (**self).exact_members(key)
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys_matching_prefix(prefix)
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        (**self).union_members(keys)
    }
}

impl<I: IndexStore + ?Sized> IndexStore for Arc<I> {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        (**self).exact_members(key)
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys_matching_prefix(prefix)
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        (**self).union_members(keys)
    }
}

/// Build the index key for `word` under `namespace`.
pub fn index_key(namespace: &str, word: &str) -> String {
    let mut key = String::with_capacity(namespace.len() + word.len());
    key.push_str(namespace);
    key.push_str(word);
    key
}

/// Split indexable words out of a record's text.
///
/// Words are whitespace-separated and lowercased; duplicates are dropped.
pub fn index_words(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}
