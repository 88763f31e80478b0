use crate::context::RequestContext;
use crate::distribution::DistributionRegistry;
use crate::error::{EntityKind, Error, Result};
use crate::key_range::KeyRangeTable;
use crate::lock::{KeyRangeLockTable, LockStatus, LockToken};
use crate::models::{
    DataTransferTransaction, DistributedRelation, Distribution, KeyRange, Router, RouterState,
    Shard, ShardingRule,
};
use crate::registry::{RouterRegistry, ShardRegistry, ShardingRuleRegistry};
use crate::snapshot::Snapshot;
use crate::transfer::TransferLog;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use tracing::{debug, warn};

/// The store façade: the single entry point over all registries. Each
/// collection has its own guard; operations touching more than one acquire
/// them in the fixed order
///
///   distributions -> sharding rules -> key ranges -> shards -> routers ->
///   transfer transactions
///
/// which rules out lock-order inversion. Foreign-key checks hold the
/// distributions read guard across the dependent insert, so a concurrent
/// distribution drop cannot slip between check and insert. The per-range
/// lock table is only touched under at least a read guard on the key range
/// table, so a range cannot be dropped out from under a lock transition.
///
/// Construct one per process (or per test) and hand out references; there is
/// no ambient singleton.
#[derive(Debug, Default)]
pub struct MemQdb {
    distributions: RwLock<DistributionRegistry>,
    sharding_rules: RwLock<ShardingRuleRegistry>,
    key_ranges: RwLock<KeyRangeTable>,
    shards: RwLock<ShardRegistry>,
    routers: RwLock<RouterRegistry>,
    transfer_txs: RwLock<TransferLog>,
    locks: KeyRangeLockTable,
    snapshot_path: Option<PathBuf>,
    /// Serializes whole dumps; see `dump`.
    dump_lock: Mutex<()>,
}

impl MemQdb {
    /// An empty, purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the store from a JSON snapshot. With a path, state is loaded
    /// from the file if it exists and every durable mutation re-dumps the
    /// full state; with `None` the store is ephemeral, identical to `new`.
    pub fn restore(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::new());
        };
        let snapshot = Snapshot::load(&path)?.unwrap_or_default();
        let store = Self {
            distributions: RwLock::new(snapshot.distributions),
            sharding_rules: RwLock::new(snapshot.sharding_rules),
            key_ranges: RwLock::new(snapshot.key_ranges),
            shards: RwLock::new(snapshot.shards),
            routers: RwLock::new(snapshot.routers),
            transfer_txs: RwLock::new(TransferLog::default()),
            locks: KeyRangeLockTable::default(),
            snapshot_path: Some(path),
            dump_lock: Mutex::new(()),
        };
        for id in store.key_ranges.read().ids() {
            store.locks.register(&id);
        }
        Ok(store)
    }

    /// Forces a snapshot dump. A no-op for ephemeral stores.
    pub fn flush(&self) -> Result<()> {
        self.dump()
    }

    /// Dumps the durable collections. Taken after mutation guards are
    /// released: the read guards below give a consistent cut of the state at
    /// some point at or after the mutation that triggered the dump.
    fn dump(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        // One dump at a time. The state is cloned under the same lock, so
        // dumps reach the file in snapshot order and two writers can never
        // truncate each other mid-write.
        let _dump = self.dump_lock.lock();
        let distributions = self.distributions.read();
        let sharding_rules = self.sharding_rules.read();
        let key_ranges = self.key_ranges.read();
        let shards = self.shards.read();
        let routers = self.routers.read();
        let snapshot = Snapshot {
            distributions: distributions.clone(),
            sharding_rules: sharding_rules.clone(),
            key_ranges: key_ranges.clone(),
            shards: shards.clone(),
            routers: routers.clone(),
        };
        snapshot.write(path)
    }

    // ---- distributions ----

    pub fn create_distribution(
        &self,
        ctx: &RequestContext,
        distribution: Distribution,
    ) -> Result<()> {
        ctx.ensure_active()?;
        let id = distribution.id.clone();
        self.distributions.write().create(distribution)?;
        debug!(distribution = %id, "created distribution");
        self.dump()
    }

    /// Resolves either a distribution id or a relation name, the id taking
    /// precedence.
    pub fn get_distribution(
        &self,
        ctx: &RequestContext,
        id_or_relation: &str,
    ) -> Result<Distribution> {
        ctx.ensure_active()?;
        self.distributions.read().get(id_or_relation).cloned()
    }

    pub fn list_distributions(&self, ctx: &RequestContext) -> Result<Vec<Distribution>> {
        ctx.ensure_active()?;
        Ok(self.distributions.read().list())
    }

    /// No cascade: key ranges and sharding rules referencing the dropped
    /// distribution stay put, their foreign key having been validated at
    /// creation time only.
    pub fn drop_distribution(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        (*self.distributions.write()).drop(id)?;
        debug!(distribution = %id, "dropped distribution");
        self.dump()
    }

    /// Atomically re-parents each relation onto the target distribution,
    /// removing it from its current owner first.
    pub fn alter_distribution_attach(
        &self,
        ctx: &RequestContext,
        id: &str,
        relations: Vec<DistributedRelation>,
    ) -> Result<()> {
        ctx.ensure_active()?;
        self.distributions.write().attach(id, relations)?;
        debug!(distribution = %id, "attached relations");
        self.dump()
    }

    pub fn alter_distribution_detach(
        &self,
        ctx: &RequestContext,
        id: &str,
        relation: &str,
    ) -> Result<()> {
        ctx.ensure_active()?;
        self.distributions.write().detach(id, relation)?;
        debug!(distribution = %id, relation = %relation, "detached relation");
        self.dump()
    }

    // ---- sharding rules ----

    pub fn add_sharding_rule(&self, ctx: &RequestContext, rule: ShardingRule) -> Result<()> {
        ctx.ensure_active()?;
        {
            let distributions = self.distributions.read();
            let mut rules = self.sharding_rules.write();
            if !distributions.contains(&rule.distribution_id) {
                return Err(Error::not_found(
                    EntityKind::Distribution,
                    &rule.distribution_id,
                ));
            }
            let id = rule.id.clone();
            rules.add(rule)?;
            debug!(rule = %id, "added sharding rule");
        }
        self.dump()
    }

    pub fn get_sharding_rule(&self, ctx: &RequestContext, id: &str) -> Result<ShardingRule> {
        ctx.ensure_active()?;
        self.sharding_rules.read().get(id).cloned()
    }

    pub fn list_sharding_rules(&self, ctx: &RequestContext) -> Result<Vec<ShardingRule>> {
        ctx.ensure_active()?;
        Ok(self.sharding_rules.read().list())
    }

    pub fn drop_sharding_rule(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        (*self.sharding_rules.write()).drop(id)?;
        debug!(rule = %id, "dropped sharding rule");
        self.dump()
    }

    /// Returns the removed rule ids. A second call on an empty registry is a
    /// no-op returning the empty set.
    pub fn drop_sharding_rule_all(&self, ctx: &RequestContext) -> Result<Vec<String>> {
        ctx.ensure_active()?;
        let removed = self.sharding_rules.write().drop_all();
        debug!(count = removed.len(), "dropped all sharding rules");
        self.dump()?;
        Ok(removed)
    }

    // ---- key ranges ----

    pub fn add_key_range(&self, ctx: &RequestContext, key_range: KeyRange) -> Result<()> {
        ctx.ensure_active()?;
        {
            let distributions = self.distributions.read();
            let mut key_ranges = self.key_ranges.write();
            if !distributions.contains(&key_range.distribution_id) {
                return Err(Error::not_found(
                    EntityKind::Distribution,
                    &key_range.distribution_id,
                ));
            }
            let id = key_range.id.clone();
            key_ranges.add(key_range)?;
            self.locks.register(&id);
            debug!(key_range = %id, "added key range");
        }
        self.dump()
    }

    pub fn get_key_range(&self, ctx: &RequestContext, id: &str) -> Result<KeyRange> {
        ctx.ensure_active()?;
        self.key_ranges.read().get(id).cloned()
    }

    pub fn list_key_ranges(&self, ctx: &RequestContext) -> Result<Vec<KeyRange>> {
        ctx.ensure_active()?;
        Ok(self.key_ranges.read().list())
    }

    /// Replaces the bounds/shard/distribution of an existing range. The
    /// distribution reference is not re-validated here: the foreign key is
    /// checked at creation time only.
    pub fn update_key_range(&self, ctx: &RequestContext, key_range: KeyRange) -> Result<()> {
        ctx.ensure_active()?;
        {
            let mut key_ranges = self.key_ranges.write();
            let id = key_range.id.clone();
            key_ranges.update(key_range)?;
            debug!(key_range = %id, "updated key range");
        }
        self.dump()
    }

    pub fn drop_key_range(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        {
            let mut key_ranges = self.key_ranges.write();
            (*key_ranges).drop(id)?;
            self.locks.unregister(id);
            debug!(key_range = %id, "dropped key range");
        }
        self.dump()
    }

    pub fn drop_key_range_all(&self, ctx: &RequestContext) -> Result<()> {
        ctx.ensure_active()?;
        {
            let mut key_ranges = self.key_ranges.write();
            let removed = key_ranges.drop_all();
            for id in &removed {
                self.locks.unregister(id);
            }
            debug!(count = removed.len(), "dropped all key ranges");
        }
        self.dump()
    }

    // ---- key range locks ----

    /// Acquires exclusive resharding intent on the range. Fails fast with
    /// `LockConflict` if another caller holds it; retries with backoff are
    /// the caller's job. The returned token is required by unlock.
    pub fn lock_key_range(&self, ctx: &RequestContext, id: &str) -> Result<LockToken> {
        ctx.ensure_active()?;
        // Hold the table guard so a concurrent drop cannot remove the range
        // mid-transition.
        let _table = self.key_ranges.read();
        self.locks.lock(id)
    }

    pub fn unlock_key_range(&self, ctx: &RequestContext, id: &str, token: LockToken) -> Result<()> {
        ctx.ensure_active()?;
        let _table = self.key_ranges.read();
        self.locks.unlock(id, token)
    }

    /// Marks the range safe for concurrent reads during a non-exclusive
    /// migration phase. Independent of the exclusive lock.
    pub fn share_key_range(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        let _table = self.key_ranges.read();
        self.locks.share(id)
    }

    pub fn key_range_lock_status(&self, ctx: &RequestContext, id: &str) -> Result<LockStatus> {
        ctx.ensure_active()?;
        let _table = self.key_ranges.read();
        self.locks.status(id)
    }

    // ---- shards ----

    pub fn add_shard(&self, ctx: &RequestContext, shard: Shard) -> Result<()> {
        ctx.ensure_active()?;
        let id = shard.id.clone();
        self.shards.write().add(shard)?;
        debug!(shard = %id, "added shard");
        self.dump()
    }

    pub fn get_shard(&self, ctx: &RequestContext, id: &str) -> Result<Shard> {
        ctx.ensure_active()?;
        self.shards.read().get(id).cloned()
    }

    pub fn list_shards(&self, ctx: &RequestContext) -> Result<Vec<Shard>> {
        ctx.ensure_active()?;
        Ok(self.shards.read().list())
    }

    // ---- routers ----

    pub fn add_router(&self, ctx: &RequestContext, router: Router) -> Result<()> {
        ctx.ensure_active()?;
        let id = router.id.clone();
        self.routers.write().add(router)?;
        debug!(router = %id, "added router");
        self.dump()
    }

    pub fn get_router(&self, ctx: &RequestContext, id: &str) -> Result<Router> {
        ctx.ensure_active()?;
        self.routers.read().get(id).cloned()
    }

    pub fn list_routers(&self, ctx: &RequestContext) -> Result<Vec<Router>> {
        ctx.ensure_active()?;
        Ok(self.routers.read().list())
    }

    pub fn delete_router(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        self.routers.write().delete(id)?;
        debug!(router = %id, "deleted router");
        self.dump()
    }

    pub fn open_router(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        self.routers.write().set_state(id, RouterState::Open)?;
        debug!(router = %id, "opened router");
        self.dump()
    }

    pub fn close_router(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        ctx.ensure_active()?;
        self.routers.write().set_state(id, RouterState::Closed)?;
        debug!(router = %id, "closed router");
        self.dump()
    }

    // ---- transfer transactions ----

    /// Upserts the transfer record for the originating shard, overwriting
    /// any prior one. Runtime-only: not part of the snapshot.
    pub fn record_transfer_tx(
        &self,
        ctx: &RequestContext,
        shard_id: &str,
        transaction: DataTransferTransaction,
    ) -> Result<()> {
        ctx.ensure_active()?;
        self.transfer_txs.write().record(shard_id, transaction);
        debug!(shard = %shard_id, "recorded transfer transaction");
        Ok(())
    }

    pub fn get_transfer_tx(
        &self,
        ctx: &RequestContext,
        shard_id: &str,
    ) -> Result<DataTransferTransaction> {
        ctx.ensure_active()?;
        self.transfer_txs.read().get(shard_id).cloned()
    }

    /// Idempotent: removing an absent record succeeds.
    pub fn remove_transfer_tx(&self, ctx: &RequestContext, shard_id: &str) -> Result<()> {
        ctx.ensure_active()?;
        self.transfer_txs.write().remove(shard_id);
        Ok(())
    }
}

impl Drop for MemQdb {
    fn drop(&mut self) {
        if self.snapshot_path.is_some() {
            if let Err(err) = self.dump() {
                warn!(error = %err, "final qdb snapshot dump failed");
            }
        }
    }
}
