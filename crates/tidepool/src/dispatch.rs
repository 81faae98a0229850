//! Consolidated RPC construction and the send path.
//!
//! An RPC value owns the in-flight ops of one dispatch run and a strong
//! reference to the batcher, so neither can disappear while the call is
//! outstanding. Completion hands both back to the batcher's response
//! processing.

use std::sync::Arc;
use std::time::Instant;

use crate::batcher::Batcher;
use crate::op::{InFlightOp, OpState, RowOp};
use crate::rpc::{ConsistencyLevel, ReadCall, WriteCall};
use crate::shard::ShardHandle;
use crate::txn::TransactionMetadata;

/// Everything one consolidated call needs: the batcher kept alive for the
/// duration of the call, the target shard, and the ops whose custody the RPC
/// takes.
pub(crate) struct RpcData {
    pub batcher: Arc<Batcher>,
    pub shard: Arc<ShardHandle>,
    pub allow_local: bool,
    pub need_consistent_read: bool,
    pub transaction: Option<TransactionMetadata>,
    pub deadline: Instant,
    pub ops: Vec<Arc<InFlightOp>>,
}

impl RpcData {
    fn row_ops(&self) -> Vec<Arc<RowOp>> {
        self.ops.iter().map(|op| op.op().clone()).collect()
    }

    fn mark_dispatched(&self) {
        for op in &self.ops {
            op.advance(OpState::ReadyToDispatch, OpState::Dispatched);
        }
    }
}

pub(crate) struct WriteRpc {
    pub data: RpcData,
}

impl WriteRpc {
    pub fn send(self) {
        self.data.mark_dispatched();
        let call = WriteCall {
            shard: self.data.shard.clone(),
            ops: self.data.row_ops(),
            allow_local: self.data.allow_local,
            need_consistent_read: self.data.need_consistent_read,
            transaction: self.data.transaction.clone(),
            deadline: self.data.deadline,
        };
        let batcher = self.data.batcher.clone();
        let rpc = self;
        batcher.transport().submit_write(
            call,
            Box::new(move |result| {
                let batcher = rpc.data.batcher.clone();
                batcher.process_write_response(&rpc, result);
            }),
        );
    }
}

pub(crate) struct ReadRpc {
    pub data: RpcData,
    pub consistency: ConsistencyLevel,
}

impl ReadRpc {
    pub fn send(self) {
        self.data.mark_dispatched();
        let call = ReadCall {
            shard: self.data.shard.clone(),
            ops: self.data.row_ops(),
            consistency: self.consistency,
            allow_local: self.data.allow_local,
            need_consistent_read: self.data.need_consistent_read,
            transaction: self.data.transaction.clone(),
            deadline: self.data.deadline,
        };
        let batcher = self.data.batcher.clone();
        let rpc = self;
        batcher.transport().submit_read(
            call,
            Box::new(move |result| {
                let batcher = rpc.data.batcher.clone();
                batcher.process_read_response(&rpc, result);
            }),
        );
    }
}
