//! Shard handles and the asynchronous shard-locator seam.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::TableHandle;

/// Logical node identifier within the cluster.
pub type NodeId = u64;

/// Descriptor for one shard of the keyspace. Key ranges are lexicographic and
/// end-exclusive; an empty bound is unbounded.
///
/// The locator hands out shared handles, and the batcher groups ops by handle
/// identity: two lookups that land on the same shard must yield the same
/// `Arc<ShardHandle>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardHandle {
    pub shard_id: u64,
    pub start_key: Vec<u8>,
    pub end_key: Vec<u8>,
    pub replicas: Vec<NodeId>,
    pub leaseholder: NodeId,
}

impl ShardHandle {
    /// Whether this shard's key range covers the given partition key.
    pub fn covers(&self, partition_key: &[u8]) -> bool {
        let lower_ok = self.start_key.is_empty() || partition_key >= self.start_key.as_slice();
        let upper_ok = self.end_key.is_empty() || partition_key < self.end_key.as_slice();
        lower_ok && upper_ok
    }
}

/// Callback invoked by the locator once a lookup settles.
pub type LookupCallback = Box<dyn FnOnce(Result<Arc<ShardHandle>>) + Send + 'static>;

/// Resolves the shard that currently owns a partition key.
///
/// Lookups may settle out of order and on any thread. Cancellation is not
/// required; completions that arrive after an abort are absorbed by the
/// batcher's abort path.
pub trait ShardLocator: Send + Sync + 'static {
    fn lookup_by_key(
        &self,
        table: &Arc<TableHandle>,
        partition_key: &[u8],
        deadline: Instant,
        callback: LookupCallback,
    );
}
