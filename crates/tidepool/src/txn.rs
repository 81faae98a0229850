//! The transaction-gate seam: metadata plus the prepare/flushed contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{HybridTime, ReadTime};
use crate::error::Result;
use crate::op::InFlightOp;
use crate::shard::NodeId;

/// Unique transaction identifier scoped by node and a monotonically
/// increasing counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TxnId {
    pub node_id: NodeId,
    pub counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    Snapshot,
    Serializable,
}

/// Metadata stamped onto every call that belongs to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub txn_id: TxnId,
    pub isolation: IsolationLevel,
    pub priority: u64,
    pub start_time: HybridTime,
}

/// Successful outcome of [`TransactionContext::prepare`].
#[derive(Debug, Clone)]
pub struct TransactionPrepared {
    pub metadata: TransactionMetadata,
    /// Ops may already carry metadata from an earlier flush of the same
    /// transaction.
    pub may_have_metadata: bool,
}

/// Callback the transaction fires once a deferred prepare settles.
pub type TransactionReadyCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Contract expected of a transaction attached to a batcher.
pub trait TransactionContext: Send + Sync + 'static {
    /// Ask the transaction to initialize the metadata for the given ops.
    /// Returns `None` to defer; the transaction must then invoke `ready`
    /// later, from outside this call. The gate runs inside the batcher's
    /// critical section, so a synchronous `ready` would deadlock.
    fn prepare(
        &self,
        ops: &[Arc<InFlightOp>],
        force_consistent_read: bool,
        ready: TransactionReadyCallback,
    ) -> Option<TransactionPrepared>;

    /// Observe the settled ops of one call along with the read time it used.
    fn flushed(&self, ops: &[Arc<InFlightOp>], used_read_time: Option<ReadTime>, status: &Result<()>);
}
