//! In-process index backed by an ordered map.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::{IdSet, IndexStore};
use crate::Result;

/// Index held entirely in memory.
///
/// Keys are kept ordered so a prefix scan is a single range walk.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    sets: RwLock<BTreeMap<String, IdSet>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(key, ids)` pairs.
    pub fn from_sets<K, S>(sets: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: IntoIterator<Item = i64>,
    {
        let index = Self::new();
        for (key, ids) in sets {
            index.insert(key, ids);
        }
        index
    }

    /// Add ids to the set stored under `key`.
    pub fn insert(&self, key: impl Into<String>, ids: impl IntoIterator<Item = i64>) {
        let mut sets = self.sets.write();
        sets.entry(key.into()).or_default().extend(ids);
    }
}

impl IndexStore for MemoryIndex {
    fn exact_members(&self, key: &str) -> Result<IdSet> {
        Ok(self.sets.read().get(key).cloned().unwrap_or_default())
    }

    fn keys_matching_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let sets = self.sets.read();
        Ok(sets
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn union_members(&self, keys: &[String]) -> Result<IdSet> {
        let sets = self.sets.read();
        let mut union = IdSet::new();
        for key in keys {
            if let Some(set) = sets.get(key) {
                union.extend(set.iter().copied());
            }
        }
        Ok(union)
    }
}
