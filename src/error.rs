use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Entity namespaces of the store, used to qualify lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Distribution,
    Relation,
    ShardingRule,
    KeyRange,
    Shard,
    Router,
    TransferTx,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Distribution => "distribution",
            EntityKind::Relation => "relation",
            EntityKind::ShardingRule => "sharding rule",
            EntityKind::KeyRange => "key range",
            EntityKind::Shard => "shard",
            EntityKind::Router => "router",
            EntityKind::TransferTx => "transfer transaction",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: EntityKind, id: String },

    #[error("key range {id} is already locked")]
    LockConflict { id: String },

    #[error("key range {id} is not locked")]
    NotLocked { id: String },

    #[error("lock token {token} does not match the current holder of key range {id}")]
    LockTokenMismatch { id: String, token: u64 },

    #[error("request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(kind: EntityKind, id: impl Into<String>) -> Self {
        Error::AlreadyExists {
            kind,
            id: id.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
