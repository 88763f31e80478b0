use crate::error::{EntityKind, Error, Result};
use crate::models::KeyRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key ranges keyed by id. Bounds are opaque: the table never compares or
/// merges them, and overlapping ranges are allowed to coexist while a
/// migration is in flight. Listing is sorted by id and carries the lower
/// bounds, which is enough for the routing caller to reconstruct keyspace
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct KeyRangeTable {
    ranges: HashMap<String, KeyRange>,
}

impl KeyRangeTable {
    pub fn add(&mut self, key_range: KeyRange) -> Result<()> {
        if self.ranges.contains_key(&key_range.id) {
            return Err(Error::already_exists(EntityKind::KeyRange, &key_range.id));
        }
        self.ranges.insert(key_range.id.clone(), key_range);
        Ok(())
    }

    /// Replaces the bounds/shard/distribution fields of an existing range.
    pub fn update(&mut self, key_range: KeyRange) -> Result<()> {
        let existing = self
            .ranges
            .get_mut(&key_range.id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, &key_range.id))?;
        *existing = key_range;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&KeyRange> {
        self.ranges
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))
    }

    pub fn list(&self) -> Vec<KeyRange> {
        let mut all: Vec<KeyRange> = self.ranges.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn ids(&self) -> Vec<String> {
        self.ranges.keys().cloned().collect()
    }

    pub fn drop(&mut self, id: &str) -> Result<KeyRange> {
        self.ranges
            .remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))
    }

    /// Removes every range and returns the removed ids so the caller can
    /// release the matching lock entries.
    pub fn drop_all(&mut self) -> Vec<String> {
        self.ranges.drain().map(|(id, _)| id).collect()
    }
}
