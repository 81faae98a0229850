//! Error types shared across the batching pipeline.
//!
//! A single closed enum keeps per-op failures comparable by kind, which the
//! combine-mode aggregation in the batcher depends on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes observable through the batcher facade and the error sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Partition-key derivation failed during admission.
    #[error("bad partition key: {0}")]
    BadKey(String),
    /// A call arrived while the batcher was not in a state to accept it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// The shard locator could not resolve the owner of a key.
    #[error("shard lookup failed: {0}")]
    LookupFailed(String),
    /// The batch was aborted before the operation was dispatched.
    #[error("batch aborted: {0}")]
    Aborted(String),
    /// A whole remote call failed; recorded against every op it carried.
    #[error("rpc failed: {0}")]
    RpcFailed(String),
    /// A per-row error reported by a write response.
    #[error("row error: {0}")]
    RowError(String),
    /// The transaction reported an error instead of becoming ready.
    #[error("transaction not ready: {0}")]
    TransactionNotReady(String),
    /// Batch-level failure when any op failed and combine mode is off. The
    /// caller drains the details from the error sink.
    #[error("errors occurred while reaching out to the shard servers")]
    FlushFailed,
    /// Combine-mode sentinel used once failures of different kinds mix.
    #[error("multiple failures")]
    Combined,
}

/// Stable discriminant used by combine-mode aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadKey,
    InvalidState,
    LookupFailed,
    Aborted,
    RpcFailed,
    RowError,
    TransactionNotReady,
    FlushFailed,
    Combined,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadKey(_) => ErrorKind::BadKey,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::LookupFailed(_) => ErrorKind::LookupFailed,
            Error::Aborted(_) => ErrorKind::Aborted,
            Error::RpcFailed(_) => ErrorKind::RpcFailed,
            Error::RowError(_) => ErrorKind::RowError,
            Error::TransactionNotReady(_) => ErrorKind::TransactionNotReady,
            Error::FlushFailed => ErrorKind::FlushFailed,
            Error::Combined => ErrorKind::Combined,
        }
    }
}
