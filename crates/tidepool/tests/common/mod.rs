//! Shared mock collaborators for batcher integration tests.
//!
//! The locator and transport record what the batcher hands them and let the
//! test decide when (and with what) each lookup or call settles, so the
//! rendezvous and ordering invariants can be asserted deterministically.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tidepool::{
    ConsistencyLevel, Error, FlushCallback, HybridTime, InFlightOp, IsolationLevel,
    LookupCallback, Partitioning, ReadCall, ReadDone, ReadResponse, ReadTime, RowOp, RpcTransport,
    ShardHandle, ShardLocator, TableHandle, TransactionContext, TransactionMetadata,
    TransactionPrepared, TransactionReadyCallback, TxnId, WriteCall, WriteDone, WriteResponse,
};

pub fn shard(shard_id: u64, start: &[u8], end: &[u8]) -> Arc<ShardHandle> {
    Arc::new(ShardHandle {
        shard_id,
        start_key: start.to_vec(),
        end_key: end.to_vec(),
        replicas: vec![1, 2, 3],
        leaseholder: 1,
    })
}

pub fn range_table(name: &str) -> Arc<TableHandle> {
    Arc::new(TableHandle::new(name, Partitioning::Range))
}

pub fn hash_table(name: &str) -> Arc<TableHandle> {
    Arc::new(TableHandle::new(name, Partitioning::Hash))
}

pub fn write_op(table: &Arc<TableHandle>, key: &str) -> Arc<RowOp> {
    Arc::new(RowOp::write(table.clone(), key, format!("v-{key}")))
}

pub fn read_op(table: &Arc<TableHandle>, key: &str) -> Arc<RowOp> {
    Arc::new(RowOp::read(table.clone(), key))
}

pub fn row_keys(ops: &[Arc<RowOp>]) -> Vec<Vec<u8>> {
    ops.iter().map(|op| op.row_key().to_vec()).collect()
}

/// Locator that routes partition keys over a fixed shard list, optionally
/// parking lookups until the test releases them.
pub struct TestLocator {
    shards: Vec<Arc<ShardHandle>>,
    hold: AtomicBool,
    inner: Mutex<LocatorInner>,
}

#[derive(Default)]
struct LocatorInner {
    pending: Vec<(Vec<u8>, LookupCallback)>,
    failures: Vec<(Vec<u8>, Error)>,
}

impl TestLocator {
    pub fn new(shards: Vec<Arc<ShardHandle>>) -> Arc<Self> {
        Arc::new(Self {
            shards,
            hold: AtomicBool::new(false),
            inner: Mutex::new(LocatorInner::default()),
        })
    }

    /// One shard covering the whole keyspace.
    pub fn whole_keyspace() -> (Arc<Self>, Arc<ShardHandle>) {
        let only = shard(1, b"", b"");
        (Self::new(vec![only.clone()]), only)
    }

    /// Park lookups instead of resolving them synchronously.
    pub fn hold_lookups(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Fail lookups for this exact partition key.
    pub fn fail_key(&self, partition_key: &[u8], error: Error) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .push((partition_key.to_vec(), error));
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Release the oldest parked lookup.
    pub fn release_next(&self) {
        let (key, callback) = {
            let mut inner = self.inner.lock().unwrap();
            assert!(!inner.pending.is_empty(), "no parked lookups");
            inner.pending.remove(0)
        };
        let result = self.resolve(&key);
        callback(result);
    }

    /// Release the newest parked lookup.
    pub fn release_last(&self) {
        let (key, callback) = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.pop().expect("no parked lookups")
        };
        let result = self.resolve(&key);
        callback(result);
    }

    pub fn release_all(&self) {
        while self.pending() > 0 {
            self.release_next();
        }
    }

    fn resolve(&self, partition_key: &[u8]) -> tidepool::Result<Arc<ShardHandle>> {
        {
            let inner = self.inner.lock().unwrap();
            if let Some((_, error)) = inner
                .failures
                .iter()
                .find(|(key, _)| key.as_slice() == partition_key)
            {
                return Err(error.clone());
            }
        }
        self.shards
            .iter()
            .find(|shard| shard.covers(partition_key))
            .cloned()
            .ok_or_else(|| Error::LookupFailed(format!("no shard covers {partition_key:?}")))
    }
}

impl ShardLocator for TestLocator {
    fn lookup_by_key(
        &self,
        _table: &Arc<TableHandle>,
        partition_key: &[u8],
        _deadline: Instant,
        callback: LookupCallback,
    ) {
        if self.hold.load(Ordering::SeqCst) {
            self.inner
                .lock()
                .unwrap()
                .pending
                .push((partition_key.to_vec(), callback));
            return;
        }
        let result = self.resolve(partition_key);
        callback(result);
    }
}

/// The kind and consistency of one submitted call, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    Write,
    Read(ConsistencyLevel),
}

struct PendingWrite {
    call: WriteCall,
    done: Option<WriteDone>,
}

struct PendingRead {
    call: ReadCall,
    done: Option<ReadDone>,
}

#[derive(Default)]
struct TransportInner {
    writes: Vec<PendingWrite>,
    reads: Vec<PendingRead>,
    order: Vec<SentKind>,
}

/// Transport that records every submitted call and completes them only when
/// the test says so.
pub struct TestTransport {
    max_sidecars: usize,
    inner: Mutex<TransportInner>,
}

impl TestTransport {
    pub fn new() -> Arc<Self> {
        Self::with_max_sidecars(1024)
    }

    pub fn with_max_sidecars(max_sidecars: usize) -> Arc<Self> {
        Arc::new(Self {
            max_sidecars,
            inner: Mutex::new(TransportInner::default()),
        })
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().unwrap().writes.len()
    }

    pub fn read_count(&self) -> usize {
        self.inner.lock().unwrap().reads.len()
    }

    pub fn total_count(&self) -> usize {
        self.write_count() + self.read_count()
    }

    pub fn order(&self) -> Vec<SentKind> {
        self.inner.lock().unwrap().order.clone()
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.inner
            .lock()
            .unwrap()
            .writes
            .iter()
            .map(|pending| pending.call.clone())
            .collect()
    }

    pub fn read_calls(&self) -> Vec<ReadCall> {
        self.inner
            .lock()
            .unwrap()
            .reads
            .iter()
            .map(|pending| pending.call.clone())
            .collect()
    }

    pub fn complete_write(&self, index: usize, result: tidepool::Result<WriteResponse>) {
        let done = {
            let mut inner = self.inner.lock().unwrap();
            inner.writes[index]
                .done
                .take()
                .expect("write already completed")
        };
        done(result);
    }

    pub fn complete_read(&self, index: usize, result: tidepool::Result<ReadResponse>) {
        let done = {
            let mut inner = self.inner.lock().unwrap();
            inner.reads[index]
                .done
                .take()
                .expect("read already completed")
        };
        done(result);
    }

    /// Complete every still-pending call with an empty success.
    pub fn complete_all_ok(&self) {
        let (writes, reads) = {
            let mut inner = self.inner.lock().unwrap();
            let writes: Vec<WriteDone> = inner
                .writes
                .iter_mut()
                .filter_map(|pending| pending.done.take())
                .collect();
            let reads: Vec<ReadDone> = inner
                .reads
                .iter_mut()
                .filter_map(|pending| pending.done.take())
                .collect();
            (writes, reads)
        };
        for done in writes {
            done(Ok(WriteResponse::default()));
        }
        for done in reads {
            done(Ok(ReadResponse::default()));
        }
    }
}

impl RpcTransport for TestTransport {
    fn max_sidecar_slices(&self) -> usize {
        self.max_sidecars
    }

    fn submit_write(&self, call: WriteCall, done: WriteDone) {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(SentKind::Write);
        inner.writes.push(PendingWrite {
            call,
            done: Some(done),
        });
    }

    fn submit_read(&self, call: ReadCall, done: ReadDone) {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(SentKind::Read(call.consistency));
        inner.reads.push(PendingRead {
            call,
            done: Some(done),
        });
    }
}

/// One record per `flushed` notification.
#[derive(Clone)]
pub struct FlushedRecord {
    pub ops: usize,
    pub used_read_time: Option<ReadTime>,
    pub status: tidepool::Result<()>,
}

/// Transaction that can defer its first prepare and records every `flushed`
/// notification.
pub struct TestTransaction {
    metadata: TransactionMetadata,
    defer_first: bool,
    prepare_calls: AtomicUsize,
    ready: Mutex<Option<TransactionReadyCallback>>,
    flushed: Mutex<Vec<FlushedRecord>>,
}

impl TestTransaction {
    fn with_defer(defer_first: bool) -> Arc<Self> {
        Arc::new(Self {
            metadata: TransactionMetadata {
                txn_id: TxnId {
                    node_id: 7,
                    counter: 1042,
                },
                isolation: IsolationLevel::Snapshot,
                priority: 3,
                start_time: HybridTime::from_micros(1_700_000_000_000_000),
            },
            defer_first,
            prepare_calls: AtomicUsize::new(0),
            ready: Mutex::new(None),
            flushed: Mutex::new(Vec::new()),
        })
    }

    pub fn ready_immediately() -> Arc<Self> {
        Self::with_defer(false)
    }

    /// Defer the first prepare; the test resumes it with [`fire_ready`].
    pub fn deferred() -> Arc<Self> {
        Self::with_defer(true)
    }

    pub fn metadata(&self) -> &TransactionMetadata {
        &self.metadata
    }

    pub fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn fire_ready(&self, status: tidepool::Result<()>) {
        let ready = self
            .ready
            .lock()
            .unwrap()
            .take()
            .expect("no deferred prepare to resume");
        ready(status);
    }

    pub fn flushed_records(&self) -> Vec<FlushedRecord> {
        self.flushed.lock().unwrap().clone()
    }
}

impl TransactionContext for TestTransaction {
    fn prepare(
        &self,
        _ops: &[Arc<InFlightOp>],
        _force_consistent_read: bool,
        ready: TransactionReadyCallback,
    ) -> Option<TransactionPrepared> {
        let calls = self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.defer_first && calls == 0 {
            *self.ready.lock().unwrap() = Some(ready);
            return None;
        }
        Some(TransactionPrepared {
            metadata: self.metadata.clone(),
            may_have_metadata: false,
        })
    }

    fn flushed(
        &self,
        ops: &[Arc<InFlightOp>],
        used_read_time: Option<ReadTime>,
        status: &tidepool::Result<()>,
    ) {
        self.flushed.lock().unwrap().push(FlushedRecord {
            ops: ops.len(),
            used_read_time,
            status: status.clone(),
        });
    }
}

/// Captures the terminal flush callback's status and invocation count.
pub struct FlushResult {
    inner: Arc<FlushResultInner>,
}

#[derive(Default)]
struct FlushResultInner {
    status: Mutex<Option<tidepool::Result<()>>>,
    calls: AtomicUsize,
}

impl FlushResult {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FlushResultInner::default()),
        }
    }

    pub fn callback(&self) -> FlushCallback {
        let inner = self.inner.clone();
        Box::new(move |status| {
            inner.calls.fetch_add(1, Ordering::SeqCst);
            *inner.status.lock().unwrap() = Some(status);
        })
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> Option<tidepool::Result<()>> {
        self.inner.status.lock().unwrap().clone()
    }
}
