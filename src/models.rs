use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named partitioning scheme: the shape of its partition key and the
/// relations it owns. A relation name belongs to at most one distribution at
/// any instant; ownership moves atomically via attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    /// Column type descriptors of the partition key, in key order.
    pub col_types: Vec<String>,
    pub relations: HashMap<String, DistributedRelation>,
}

impl Distribution {
    pub fn new(id: impl Into<String>, col_types: Vec<String>) -> Self {
        Self {
            id: id.into(),
            col_types,
            relations: HashMap::new(),
        }
    }
}

/// A relation distributed under some distribution, projected onto the
/// columns that form its partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedRelation {
    pub name: String,
    pub column_names: Vec<String>,
}

impl DistributedRelation {
    pub fn new(name: impl Into<String>, column_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            column_names,
        }
    }
}

/// A physical database instance, referenced by key ranges and transfer
/// transactions by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub id: String,
    pub hosts: Vec<String>,
}

impl Shard {
    pub fn new(id: impl Into<String>, hosts: Vec<String>) -> Self {
        Self {
            id: id.into(),
            hosts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRuleEntry {
    pub column: String,
}

/// Per-table declaration of the partitioning columns, tied to a
/// distribution. The distribution must exist when the rule is added; the
/// reference is not kept live afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRule {
    pub id: String,
    pub table_name: String,
    pub entries: Vec<ShardingRuleEntry>,
    pub distribution_id: String,
}

/// A contiguous slice of a distribution's keyspace bound to one shard.
/// Ranges are ordered by lower bound within their distribution; the upper
/// bound is implied by the next range. The store treats bounds as opaque
/// bytes and never rejects overlap, which is the resharding caller's
/// protocol to manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub id: String,
    pub lower_bound: Vec<u8>,
    pub shard_id: String,
    pub distribution_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    Open,
    Closed,
}

/// A registered proxy instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    pub id: String,
    pub address: String,
    pub state: RouterState,
}

impl Router {
    pub fn new(id: impl Into<String>, address: impl Into<String>, state: RouterState) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            state,
        }
    }
}

/// Bookkeeping for one in-flight or recently completed key-range migration,
/// keyed by the originating shard. One slot per source shard: recording a
/// new transaction overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransferTransaction {
    pub from_shard_id: String,
    pub to_shard_id: String,
    pub from_tx_name: String,
    pub to_tx_name: String,
    pub from_status: String,
    pub to_status: String,
}
