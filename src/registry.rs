use crate::error::{EntityKind, Error, Result};
use crate::models::{Router, RouterState, Shard, ShardingRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shards keyed by id. No cross-entity invariants: key ranges and transfer
/// transactions reference shards by id without a live check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ShardRegistry {
    shards: HashMap<String, Shard>,
}

impl ShardRegistry {
    pub fn add(&mut self, shard: Shard) -> Result<()> {
        if self.shards.contains_key(&shard.id) {
            return Err(Error::already_exists(EntityKind::Shard, &shard.id));
        }
        self.shards.insert(shard.id.clone(), shard);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Shard> {
        self.shards
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Shard, id))
    }

    pub fn list(&self) -> Vec<Shard> {
        let mut all: Vec<Shard> = self.shards.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

/// Registered proxy instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RouterRegistry {
    routers: HashMap<String, Router>,
}

impl RouterRegistry {
    pub fn add(&mut self, router: Router) -> Result<()> {
        if self.routers.contains_key(&router.id) {
            return Err(Error::already_exists(EntityKind::Router, &router.id));
        }
        self.routers.insert(router.id.clone(), router);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Router> {
        self.routers
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Router, id))
    }

    pub fn list(&self) -> Vec<Router> {
        let mut all: Vec<Router> = self.routers.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.routers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(EntityKind::Router, id))
    }

    pub fn set_state(&mut self, id: &str, state: RouterState) -> Result<()> {
        let router = self
            .routers
            .get_mut(id)
            .ok_or_else(|| Error::not_found(EntityKind::Router, id))?;
        router.state = state;
        Ok(())
    }
}

/// Sharding rules keyed by id. The distribution foreign-key check happens in
/// the façade, under the distributions guard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ShardingRuleRegistry {
    rules: HashMap<String, ShardingRule>,
}

impl ShardingRuleRegistry {
    pub fn add(&mut self, rule: ShardingRule) -> Result<()> {
        if self.rules.contains_key(&rule.id) {
            return Err(Error::already_exists(EntityKind::ShardingRule, &rule.id));
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ShardingRule> {
        self.rules
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::ShardingRule, id))
    }

    pub fn list(&self) -> Vec<ShardingRule> {
        let mut all: Vec<ShardingRule> = self.rules.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn drop(&mut self, id: &str) -> Result<()> {
        self.rules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(EntityKind::ShardingRule, id))
    }

    /// Returns the removed ids so the caller can run coordinated cleanup.
    pub fn drop_all(&mut self) -> Vec<String> {
        let mut removed: Vec<String> = self.rules.drain().map(|(id, _)| id).collect();
        removed.sort();
        removed
    }
}
