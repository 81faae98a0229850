//! Row operations and their in-flight batching state.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::shard::ShardHandle;
use crate::table::TableHandle;

/// Whether an operation mutates or only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Consistency requested by a read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLevel {
    Strong,
    ConsistentPrefix,
}

/// Dispatch class: selects both the RPC type and the consistency of a run.
/// Ordered so that a within-shard sort dispatches writes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpGroup {
    Write,
    LeaderRead,
    ConsistentPrefixRead,
}

const HASH_CODE_UNSET: u32 = u32::MAX;

/// A single-row operation against a partitioned table.
///
/// The batcher treats the payload as opaque; it only consumes the table
/// reference, the access/consistency discriminators, the row key, and the
/// sidecar flag.
#[derive(Debug)]
pub struct RowOp {
    table: Arc<TableHandle>,
    access: Access,
    read_level: ReadLevel,
    follower_capable: bool,
    returns_rows: bool,
    row_key: Vec<u8>,
    payload: Vec<u8>,
    pinned_shard: Option<Arc<ShardHandle>>,
    hash_code: AtomicU32,
}

impl RowOp {
    /// A single-row write. Writes never carry a row sidecar unless opted in.
    pub fn write(table: Arc<TableHandle>, row_key: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            access: Access::Write,
            read_level: ReadLevel::Strong,
            follower_capable: false,
            returns_rows: false,
            row_key: row_key.into(),
            payload: payload.into(),
            pinned_shard: None,
            hash_code: AtomicU32::new(HASH_CODE_UNSET),
        }
    }

    /// A single-row read. Reads return their rows in a response sidecar.
    pub fn read(table: Arc<TableHandle>, row_key: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            access: Access::Read,
            read_level: ReadLevel::Strong,
            follower_capable: false,
            returns_rows: true,
            row_key: row_key.into(),
            payload: Vec::new(),
            pinned_shard: None,
            hash_code: AtomicU32::new(HASH_CODE_UNSET),
        }
    }

    pub fn with_read_level(mut self, read_level: ReadLevel) -> Self {
        self.read_level = read_level;
        self
    }

    /// Mark a cache-style read that may be served by any replica when the
    /// batcher is configured to allow follower reads.
    pub fn with_follower_capable(mut self, follower_capable: bool) -> Self {
        self.follower_capable = follower_capable;
        self
    }

    pub fn with_returns_rows(mut self, returns_rows: bool) -> Self {
        self.returns_rows = returns_rows;
        self
    }

    /// Attach an already-resolved shard, short-circuiting the lookup.
    pub fn with_pinned_shard(mut self, shard: Arc<ShardHandle>) -> Self {
        self.pinned_shard = Some(shard);
        self
    }

    pub fn table(&self) -> &Arc<TableHandle> {
        &self.table
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn read_level(&self) -> ReadLevel {
        self.read_level
    }

    pub fn follower_capable(&self) -> bool {
        self.follower_capable
    }

    pub fn returns_rows(&self) -> bool {
        self.returns_rows
    }

    pub fn row_key(&self) -> &[u8] {
        &self.row_key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn pinned_shard(&self) -> Option<&Arc<ShardHandle>> {
        self.pinned_shard.as_ref()
    }

    pub fn read_only(&self) -> bool {
        self.access == Access::Read
    }

    /// Derive this op's partition key. Writes require a row key.
    pub(crate) fn partition_key(&self) -> Result<Vec<u8>> {
        if self.row_key.is_empty() && self.access == Access::Write {
            return Err(Error::BadKey(format!(
                "write to table {} with an empty row key",
                self.table.name()
            )));
        }
        Ok(self.table.partition_key(&self.row_key))
    }

    /// Record the decoded partition hash; set at most once, at admission.
    pub(crate) fn set_hash_code(&self, hash: u16) {
        self.hash_code.store(u32::from(hash), Ordering::Relaxed);
    }

    pub fn hash_code(&self) -> Option<u16> {
        match self.hash_code.load(Ordering::Relaxed) {
            HASH_CODE_UNSET => None,
            code => Some(code as u16),
        }
    }

    pub(crate) fn buffered_bytes(&self) -> usize {
        self.row_key.len() + self.payload.len()
    }
}

/// Batching lifecycle of one admitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    LookingUpShard,
    ReadyToDispatch,
    Dispatched,
    Completed,
    Failed,
}

/// One admitted operation and its routing state.
///
/// Lock order: the batcher lock comes first; the per-op lock is never held
/// while acquiring the batcher lock.
#[derive(Debug)]
pub struct InFlightOp {
    op: Arc<RowOp>,
    partition_key: Vec<u8>,
    sequence_number: AtomicU64,
    shard: OnceLock<Arc<ShardHandle>>,
    state: Mutex<OpState>,
}

impl InFlightOp {
    pub(crate) fn new(op: Arc<RowOp>, partition_key: Vec<u8>) -> Self {
        Self {
            op,
            partition_key,
            sequence_number: AtomicU64::new(u64::MAX),
            shard: OnceLock::new(),
            state: Mutex::new(OpState::LookingUpShard),
        }
    }

    pub fn op(&self) -> &Arc<RowOp> {
        &self.op
    }

    pub fn partition_key(&self) -> &[u8] {
        &self.partition_key
    }

    /// Dense admission-order id; the stable tiebreaker for within-shard
    /// ordering.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number.load(Ordering::Relaxed)
    }

    pub(crate) fn assign_sequence_number(&self, sequence: u64) {
        self.sequence_number.store(sequence, Ordering::Relaxed);
    }

    /// The resolved owner shard; empty until the lookup settles.
    pub fn shard(&self) -> Option<&Arc<ShardHandle>> {
        self.shard.get()
    }

    pub(crate) fn attach_shard(&self, shard: Arc<ShardHandle>) {
        let attached = self.shard.set(shard).is_ok();
        debug_assert!(attached, "shard attached twice to the same op");
    }

    pub fn state(&self) -> OpState {
        *self.state.lock().unwrap()
    }

    pub(crate) fn set_state(&self, next: OpState) {
        *self.state.lock().unwrap() = next;
    }

    pub(crate) fn advance(&self, expected: OpState, next: OpState) {
        let mut state = self.state.lock().unwrap();
        debug_assert_eq!(*state, expected, "unexpected op state transition");
        *state = next;
    }
}

/// Classify an op for grouping. `allow_follower_reads` widens cache-style
/// reads into the consistent-prefix group so any replica may serve them.
pub fn op_group(op: &RowOp, allow_follower_reads: bool) -> OpGroup {
    if !op.read_only() {
        return OpGroup::Write;
    }
    if (op.follower_capable() && allow_follower_reads)
        || op.read_level() == ReadLevel::ConsistentPrefix
    {
        return OpGroup::ConsistentPrefixRead;
    }
    OpGroup::LeaderRead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Partitioning;

    fn table(partitioning: Partitioning) -> Arc<TableHandle> {
        Arc::new(TableHandle::new("t", partitioning))
    }

    #[test]
    fn writes_always_group_as_write() {
        let op = RowOp::write(table(Partitioning::Range), "k", "v");
        assert_eq!(op_group(&op, false), OpGroup::Write);
        assert_eq!(op_group(&op, true), OpGroup::Write);
    }

    #[test]
    fn strong_reads_group_as_leader_read() {
        let op = RowOp::read(table(Partitioning::Range), "k");
        assert_eq!(op_group(&op, false), OpGroup::LeaderRead);
    }

    #[test]
    fn consistent_prefix_reads_group_regardless_of_config() {
        let op = RowOp::read(table(Partitioning::Range), "k")
            .with_read_level(ReadLevel::ConsistentPrefix);
        assert_eq!(op_group(&op, false), OpGroup::ConsistentPrefixRead);
    }

    #[test]
    fn cache_reads_need_the_follower_config() {
        let op = RowOp::read(table(Partitioning::Range), "k").with_follower_capable(true);
        assert_eq!(op_group(&op, false), OpGroup::LeaderRead);
        assert_eq!(op_group(&op, true), OpGroup::ConsistentPrefixRead);
    }

    #[test]
    fn group_order_puts_writes_first() {
        assert!(OpGroup::Write < OpGroup::LeaderRead);
        assert!(OpGroup::LeaderRead < OpGroup::ConsistentPrefixRead);
    }

    #[test]
    fn empty_write_key_is_a_bad_key() {
        let op = RowOp::write(table(Partitioning::Hash), "", "v");
        assert!(matches!(op.partition_key(), Err(Error::BadKey(_))));
    }

    #[test]
    fn empty_read_key_is_allowed() {
        let op = RowOp::read(table(Partitioning::Hash), "");
        assert_eq!(op.partition_key().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hash_code_slot_starts_empty() {
        let op = RowOp::write(table(Partitioning::Hash), "k", "v");
        assert_eq!(op.hash_code(), None);
        op.set_hash_code(0xbeef);
        assert_eq!(op.hash_code(), Some(0xbeef));
    }
}
