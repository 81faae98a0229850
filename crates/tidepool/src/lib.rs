//! Client-side write/read batching for a sharded, replicated table store.
//!
//! A [`Batcher`] accepts single-row operations, resolves the owner shard of
//! each one through an asynchronous [`ShardLocator`], groups the settled ops
//! by `(shard, op group)`, and dispatches consolidated calls over an
//! [`RpcTransport`]. No call goes out before every admitted lookup settles;
//! within one `(shard, group)` pair ops are dispatched in admission order;
//! the terminal flush callback fires exactly once, off-lock, when the last
//! call settles or the batch is aborted.
//!
//! Long-latency waits (shard lookups, transaction readiness, call
//! completions) are callbacks delivered by external schedulers; the batcher
//! itself only ever blocks on its own mutexes.

pub mod batcher;
pub mod clock;
mod dispatch;
pub mod error;
pub mod executor;
pub mod op;
pub mod rpc;
pub mod shard;
pub mod sink;
pub mod table;
pub mod txn;

pub use batcher::{Batcher, BatcherConfig, BatcherOptions, BatcherState, FlushCallback};
pub use clock::{HybridTime, ReadPoint, ReadTime};
pub use error::{Error, ErrorKind, Result};
pub use executor::{CallbackExecutor, CallbackTask, TokioCallbackExecutor};
pub use op::{op_group, Access, InFlightOp, OpGroup, OpState, ReadLevel, RowOp};
pub use rpc::{
    ConsistencyLevel, PerRowError, ReadCall, ReadDone, ReadResponse, RpcTransport, WriteCall,
    WriteDone, WriteResponse,
};
pub use shard::{LookupCallback, NodeId, ShardHandle, ShardLocator};
pub use sink::{CollectedErrors, ErrorSink};
pub use table::{decode_hash_prefix, Partitioning, TableHandle};
pub use txn::{
    IsolationLevel, TransactionContext, TransactionMetadata, TransactionPrepared,
    TransactionReadyCallback, TxnId,
};
