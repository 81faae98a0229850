//! The transport seam: consolidated call and response shapes for shard RPCs.
//!
//! The transport owns the wire format. These types carry only what the
//! batcher needs for ordering, consistency, and partial-failure accounting;
//! row-data sidecars never surface at this layer.

use std::sync::Arc;
use std::time::Instant;

use crate::clock::{HybridTime, ReadTime};
use crate::error::{Error, Result};
use crate::op::RowOp;
use crate::shard::ShardHandle;
use crate::txn::TransactionMetadata;

/// Consistency requested for a consolidated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyLevel {
    Strong,
    ConsistentPrefix,
}

/// One consolidated write call for a single shard. Ops appear in dispatch
/// order; per-row errors refer back to them by index.
#[derive(Clone)]
pub struct WriteCall {
    pub shard: Arc<ShardHandle>,
    pub ops: Vec<Arc<RowOp>>,
    pub allow_local: bool,
    pub need_consistent_read: bool,
    pub transaction: Option<TransactionMetadata>,
    pub deadline: Instant,
}

/// One consolidated read call for a single shard.
#[derive(Clone)]
pub struct ReadCall {
    pub shard: Arc<ShardHandle>,
    pub ops: Vec<Arc<RowOp>>,
    pub consistency: ConsistencyLevel,
    pub allow_local: bool,
    pub need_consistent_read: bool,
    pub transaction: Option<TransactionMetadata>,
    pub deadline: Instant,
}

/// Row-level failure reported by a write response.
#[derive(Debug, Clone)]
pub struct PerRowError {
    pub row_index: usize,
    pub error: Error,
}

impl PerRowError {
    pub fn new(row_index: usize, message: impl Into<String>) -> Self {
        Self {
            row_index,
            error: Error::RowError(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteResponse {
    pub propagated_hybrid_time: Option<HybridTime>,
    pub used_read_time: Option<ReadTime>,
    pub per_row_errors: Vec<PerRowError>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadResponse {
    pub propagated_hybrid_time: Option<HybridTime>,
    pub used_read_time: Option<ReadTime>,
}

pub type WriteDone = Box<dyn FnOnce(Result<WriteResponse>) + Send + 'static>;
pub type ReadDone = Box<dyn FnOnce(Result<ReadResponse>) + Send + 'static>;

/// Submits consolidated calls to shard leaseholders (or followers).
///
/// Implementations report every failure through the completion callback,
/// including failures to send; the batcher does not distinguish the two.
/// Completions may arrive on any thread.
pub trait RpcTransport: Send + Sync + 'static {
    /// Maximum number of sidecar-bearing ops one call may carry.
    fn max_sidecar_slices(&self) -> usize;

    fn submit_write(&self, call: WriteCall, done: WriteDone);

    fn submit_read(&self, call: ReadCall, done: ReadDone);
}
