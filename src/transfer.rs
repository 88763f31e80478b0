use crate::error::{EntityKind, Error, Result};
use crate::models::DataTransferTransaction;
use std::collections::HashMap;

/// Transfer transactions keyed by originating shard. One slot per source
/// shard: recording overwrites any prior record. Tracking more than one
/// in-flight migration per shard would be a capacity extension of this
/// design, not a fix.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransferLog {
    transactions: HashMap<String, DataTransferTransaction>,
}

impl TransferLog {
    pub fn record(&mut self, shard_id: &str, transaction: DataTransferTransaction) {
        self.transactions.insert(shard_id.to_string(), transaction);
    }

    pub fn get(&self, shard_id: &str) -> Result<&DataTransferTransaction> {
        self.transactions
            .get(shard_id)
            .ok_or_else(|| Error::not_found(EntityKind::TransferTx, shard_id))
    }

    /// Idempotent: removing an absent record is not an error, so cleanup can
    /// be retried freely.
    pub fn remove(&mut self, shard_id: &str) {
        self.transactions.remove(shard_id);
    }
}
