use crate::distribution::DistributionRegistry;
use crate::error::Result;
use crate::key_range::KeyRangeTable;
use crate::registry::{RouterRegistry, ShardRegistry, ShardingRuleRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Durable view of the store, dumped as JSON after successful mutations when
/// the store was opened with a path. Lock state and transfer transactions
/// are runtime-only and deliberately absent.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub distributions: DistributionRegistry,
    pub key_ranges: KeyRangeTable,
    pub sharding_rules: ShardingRuleRegistry,
    pub shards: ShardRegistry,
    pub routers: RouterRegistry,
}

impl Snapshot {
    /// Loads a snapshot if the file exists; a missing file means a fresh
    /// store, not an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        let snapshot = serde_json::from_slice(&data)?;
        debug!(path = %path.display(), "restored qdb state");
        Ok(Some(snapshot))
    }

    /// Stages to a temp file and renames into place: a dump interrupted
    /// mid-write must not clobber the previous snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        let staged = path.with_extension("tmp");
        fs::write(&staged, data)?;
        fs::rename(&staged, path)?;
        debug!(path = %path.display(), "dumped qdb state");
        Ok(())
    }
}
