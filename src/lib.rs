//! In-memory control-plane store (QDB) for a database-sharding proxy: the
//! authoritative record of distributions and their relations, key ranges
//! with resharding locks, shards, routers, and transfer-transaction
//! bookkeeping, behind one concurrency-safe façade.
//!
//! The store performs no I/O beyond an optional JSON snapshot file and is
//! consumed in-process by routing/resharding logic. Every operation takes a
//! cancellable [`RequestContext`] and returns a taxonomy error
//! ([`Error`]) on failure; no mutation is ever left half-applied.

pub mod context;
pub mod error;
pub mod models;

mod distribution;
mod key_range;
mod lock;
mod registry;
mod snapshot;
mod store;
mod transfer;

pub use context::RequestContext;
pub use error::{EntityKind, Error, Result};
pub use lock::{LockStatus, LockToken};
pub use models::{
    DataTransferTransaction, DistributedRelation, Distribution, KeyRange, Router, RouterState,
    Shard, ShardingRule, ShardingRuleEntry,
};
pub use store::MemQdb;
