//! The batching state machine: admission, lookup rendezvous, grouping,
//! dispatch, and response accounting.
//!
//! Lock ordering in this module:
//!   - `Batcher::inner` (the batcher lock) comes first
//!   - the per-op lock in `InFlightOp` comes second
//!
//! It is important to release every lock before calling a user callback or
//! chaining into another async seam, since that code may re-enter the
//! batcher. Work destined for the outside world (error-sink delivery, the
//! terminal callback) is drained into locals under the lock and performed
//! after release.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use crate::clock::{HybridTime, ReadPoint, ReadTime};
use crate::dispatch::{ReadRpc, RpcData, WriteRpc};
use crate::error::{Error, ErrorKind, Result};
use crate::executor::{CallbackExecutor, CallbackTask};
use crate::op::{op_group, Access, InFlightOp, OpGroup, OpState, RowOp};
use crate::rpc::{ConsistencyLevel, ReadResponse, RpcTransport, WriteResponse};
use crate::shard::{ShardHandle, ShardLocator};
use crate::sink::ErrorSink;
use crate::table::decode_hash_prefix;
use crate::txn::{TransactionContext, TransactionMetadata, TransactionReadyCallback};

/// Per-flush deadline applied when the session never set a timeout.
const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(60);
/// Buffered-payload cap the session layer back-pressures against.
const DEFAULT_MAX_BUFFER_SIZE: usize = 7 * 1024 * 1024;
/// Emit the missing-timeout warning once per this many occurrences.
const MISSING_TIMEOUT_WARN_EVERY: u64 = 100_000;

static MISSING_TIMEOUT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of one batch. The state only advances forward; `Flushed` and
/// `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    GatheringOps,
    Flushing,
    Flushed,
    Aborted,
}

/// Behavior switches for one batcher.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Group cache-style reads as consistent-prefix so followers may serve
    /// them.
    pub allow_follower_reads: bool,
    /// Fold per-op failures into the terminal status instead of reporting
    /// the generic batch-level error.
    pub combine_errors: bool,
    /// Buffered-bytes cap; admission policy against it is the caller's.
    pub max_buffer_size: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            allow_follower_reads: false,
            combine_errors: false,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

/// Construction-time wiring that is optional or varies per batch.
#[derive(Default)]
pub struct BatcherOptions {
    pub config: BatcherConfig,
    pub transaction: Option<Arc<dyn TransactionContext>>,
    pub read_point: Option<Arc<ReadPoint>>,
    pub force_consistent_read: bool,
    pub executor: Option<Arc<dyn CallbackExecutor>>,
}

/// Terminal flush callback; invoked exactly once per flush lifetime.
pub type FlushCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

type SinkNotifications = Vec<(Arc<RowOp>, Error)>;

/// One batch of operations: gathered, flushed as consolidated per-shard
/// calls, then drained as responses settle.
pub struct Batcher {
    weak_self: Weak<Batcher>,
    locator: Arc<dyn ShardLocator>,
    transport: Arc<dyn RpcTransport>,
    error_sink: Arc<dyn ErrorSink>,
    transaction: Option<Arc<dyn TransactionContext>>,
    read_point: Option<Arc<ReadPoint>>,
    executor: Option<Arc<dyn CallbackExecutor>>,
    config: BatcherConfig,
    force_consistent_read: bool,
    had_errors: AtomicBool,
    buffer_bytes_used: AtomicUsize,
    inner: Mutex<Inner>,
}

struct Inner {
    state: BatcherState,
    /// Every admitted op that has not settled, keyed by sequence number.
    ops: HashMap<u64, Arc<InFlightOp>>,
    /// Ops whose lookup settled successfully, awaiting dispatch.
    ready_queue: Vec<Arc<InFlightOp>>,
    outstanding_lookups: usize,
    next_sequence_number: u64,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    flush_callback: Option<FlushCallback>,
    combined_error: Option<Error>,
    transaction_metadata: Option<TransactionMetadata>,
    may_have_metadata: bool,
}

/// Per-op snapshot taken for planning so the sort never touches a per-op
/// lock inside the comparator.
struct PlannedOp {
    in_flight: Arc<InFlightOp>,
    shard: Arc<ShardHandle>,
    group: OpGroup,
    sequence: u64,
}

impl Batcher {
    pub fn new(
        locator: Arc<dyn ShardLocator>,
        transport: Arc<dyn RpcTransport>,
        error_sink: Arc<dyn ErrorSink>,
        options: BatcherOptions,
    ) -> Arc<Batcher> {
        Arc::new_cyclic(|weak| Batcher {
            weak_self: weak.clone(),
            locator,
            transport,
            error_sink,
            transaction: options.transaction,
            read_point: options.read_point,
            executor: options.executor,
            config: options.config,
            force_consistent_read: options.force_consistent_read,
            had_errors: AtomicBool::new(false),
            buffer_bytes_used: AtomicUsize::new(0),
            inner: Mutex::new(Inner {
                state: BatcherState::GatheringOps,
                ops: HashMap::new(),
                ready_queue: Vec::new(),
                outstanding_lookups: 0,
                next_sequence_number: 0,
                timeout: None,
                deadline: None,
                flush_callback: None,
                combined_error: None,
                transaction_metadata: None,
                may_have_metadata: false,
            }),
        })
    }

    fn strong(&self) -> Arc<Batcher> {
        self.weak_self
            .upgrade()
            .expect("batcher dropped with work outstanding")
    }

    pub(crate) fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    pub fn state(&self) -> BatcherState {
        self.inner.lock().unwrap().state
    }

    pub fn has_pending_operations(&self) -> bool {
        !self.inner.lock().unwrap().ops.is_empty()
    }

    /// Ops are only considered buffered until the flush starts.
    pub fn count_buffered_operations(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        if inner.state == BatcherState::GatheringOps {
            inner.ops.len()
        } else {
            0
        }
    }

    pub fn buffer_bytes_used(&self) -> usize {
        self.buffer_bytes_used.load(Ordering::Relaxed)
    }

    pub fn max_buffer_size(&self) -> usize {
        self.config.max_buffer_size
    }

    /// Whether a transaction metadata snapshot from an earlier flush may
    /// already be attached to the ops.
    pub fn may_have_metadata(&self) -> bool {
        self.inner.lock().unwrap().may_have_metadata
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.inner.lock().unwrap().timeout = Some(timeout);
    }

    /// Admit one operation and start resolving its owner shard.
    pub fn add(&self, op: Arc<RowOp>) -> Result<()> {
        // Start the lookup as soon as the op arrives so the batch is ready
        // to go when the user flushes.
        let partition_key = op.partition_key()?;

        if op.table().is_hash_partitioned() {
            match op.access() {
                Access::Write => {
                    if let Some(hash) = decode_hash_prefix(&partition_key) {
                        op.set_hash_code(hash);
                    }
                }
                Access::Read => {
                    if !partition_key.is_empty() {
                        if let Some(hash) = decode_hash_prefix(&partition_key) {
                            op.set_hash_code(hash);
                        }
                    }
                }
            }
        }

        let in_flight = Arc::new(InFlightOp::new(op.clone(), partition_key));
        let deadline = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != BatcherState::GatheringOps {
                return Err(Error::InvalidState(
                    "add on a batcher that already started flushing",
                ));
            }
            let sequence = inner.next_sequence_number;
            inner.next_sequence_number += 1;
            in_flight.assign_sequence_number(sequence);
            inner.ops.insert(sequence, in_flight.clone());
            inner.outstanding_lookups += 1;
            // The flush deadline is only computed once the flush starts;
            // lookups racing ahead of it get a fresh one derived from the
            // current timeout.
            inner
                .deadline
                .unwrap_or_else(|| Self::compute_deadline(inner.timeout))
        };
        self.buffer_bytes_used
            .fetch_add(op.buffered_bytes(), Ordering::Relaxed);

        tracing::trace!(
            table = op.table().name(),
            seq = in_flight.sequence_number(),
            "looking up shard"
        );

        if let Some(shard) = op.pinned_shard().cloned() {
            self.shard_lookup_finished(in_flight, Ok(shard));
        } else {
            let batcher = self.strong();
            let for_callback = in_flight.clone();
            self.locator.lookup_by_key(
                op.table(),
                in_flight.partition_key(),
                deadline,
                Box::new(move |result| batcher.shard_lookup_finished(for_callback, result)),
            );
        }
        Ok(())
    }

    /// Start flushing. Returns immediately; `callback` fires exactly once,
    /// when every dispatched call settles or when the batch is aborted.
    pub fn flush_async(&self, callback: FlushCallback) -> Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != BatcherState::GatheringOps {
                return Err(Error::InvalidState(
                    "flush_async on a batcher that already started flushing",
                ));
            }
            inner.state = BatcherState::Flushing;
            inner.flush_callback = Some(callback);
            inner.deadline = Some(Self::compute_deadline(inner.timeout));
        }

        // Nothing buffered: the callback fires right away. Otherwise the
        // last settling op drains the in-flight set and fires it.
        self.check_for_finished_flush();

        // Idempotent: a no-op until the last outstanding lookup settles.
        self.flush_buffers_if_ready();
        Ok(())
    }

    /// Abort the batch. Ops whose lookup settled but which were not yet
    /// handed to a call are failed with `status`; dispatched calls run to
    /// completion and are accounted normally when they return.
    pub fn abort(&self, status: Error) {
        let mut notify: SinkNotifications = Vec::new();
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            inner.state = BatcherState::Aborted;

            let to_abort: Vec<Arc<InFlightOp>> = inner
                .ops
                .values()
                .filter(|op| op.state() == OpState::ReadyToDispatch)
                .cloned()
                .collect();
            for op in to_abort {
                tracing::debug!(seq = op.sequence_number(), "aborting op");
                self.mark_in_flight_op_failed(&mut inner, &op, status.clone(), &mut notify);
            }
            inner.ready_queue.clear();
            inner.flush_callback.take()
        };

        self.deliver_sink(notify);
        if let Some(callback) = callback {
            self.run_callback(callback, Err(status));
        }
    }

    fn compute_deadline(timeout: Option<Duration>) -> Instant {
        let timeout = match timeout {
            Some(timeout) => timeout,
            None => {
                if MISSING_TIMEOUT_COUNT.fetch_add(1, Ordering::Relaxed) % MISSING_TIMEOUT_WARN_EVERY
                    == 0
                {
                    tracing::warn!("flushing with no timeout set, using the 60 second default");
                }
                DEFAULT_FLUSH_TIMEOUT
            }
        };
        Instant::now() + timeout
    }

    /// Lookup completion path; invoked by the locator from any thread, and
    /// directly by `add` for pinned shards.
    fn shard_lookup_finished(&self, in_flight: Arc<InFlightOp>, result: Result<Arc<ShardHandle>>) {
        let mut notify: SinkNotifications = Vec::new();
        let lookup_failed;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.outstanding_lookups -= 1;

            if inner.state == BatcherState::Aborted {
                tracing::debug!(
                    seq = in_flight.sequence_number(),
                    "shard lookup settled after abort"
                );
                self.mark_in_flight_op_failed(
                    &mut inner,
                    &in_flight,
                    Error::Aborted("batch aborted".into()),
                    &mut notify,
                );
                drop(inner);
                self.deliver_sink(notify);
                return;
            }

            tracing::trace!(
                seq = in_flight.sequence_number(),
                outstanding = inner.outstanding_lookups,
                ok = result.is_ok(),
                "shard lookup finished"
            );

            match result {
                Ok(shard) => {
                    in_flight.attach_shard(shard);
                    in_flight.advance(OpState::LookingUpShard, OpState::ReadyToDispatch);
                    inner.ready_queue.push(in_flight.clone());
                    lookup_failed = false;
                }
                Err(error) => {
                    self.mark_in_flight_op_failed(&mut inner, &in_flight, error, &mut notify);
                    lookup_failed = true;
                }
            }
        }

        self.deliver_sink(notify);
        if lookup_failed {
            self.check_for_finished_flush();
        }
        self.flush_buffers_if_ready();
    }

    /// Dispatch attempt. A no-op unless the flush has started and every
    /// outstanding lookup has settled; that rendezvous is what keeps ops
    /// from being flushed one by one as their lookups trickle in.
    fn flush_buffers_if_ready(&self) {
        let mut force_consistent_read = self.force_consistent_read;
        let (ready, deadline, transaction_metadata) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != BatcherState::Flushing {
                tracing::trace!("not dispatching: flush not started");
                return;
            }
            if inner.outstanding_lookups != 0 {
                tracing::trace!(
                    outstanding = inner.outstanding_lookups,
                    "not dispatching: lookups outstanding"
                );
                return;
            }

            if let Some(transaction) = &self.transaction {
                force_consistent_read = true;
                // The transaction initializes the metadata stamped onto every
                // call of this flush. When it is not ready yet it re-enters
                // through the ready callback.
                let mut prepare_ops: Vec<Arc<InFlightOp>> = inner.ops.values().cloned().collect();
                prepare_ops.sort_by_key(|op| op.sequence_number());
                let batcher = self.strong();
                let ready_callback: TransactionReadyCallback =
                    Box::new(move |status| match status {
                        Ok(()) => batcher.flush_buffers_if_ready(),
                        Err(error) => batcher.abort(error),
                    });
                match transaction.prepare(&prepare_ops, self.force_consistent_read, ready_callback)
                {
                    Some(prepared) => {
                        inner.transaction_metadata = Some(prepared.metadata);
                        inner.may_have_metadata = prepared.may_have_metadata;
                    }
                    None => return,
                }
            }

            let deadline = inner
                .deadline
                .unwrap_or_else(|| Self::compute_deadline(inner.timeout));
            (
                std::mem::take(&mut inner.ready_queue),
                deadline,
                inner.transaction_metadata.clone(),
            )
        };

        if ready.is_empty() {
            return;
        }

        let mut ops: Vec<PlannedOp> = ready
            .into_iter()
            .map(|in_flight| {
                let shard = in_flight
                    .shard()
                    .cloned()
                    .expect("ready op without a resolved shard");
                let group = op_group(in_flight.op(), self.config.allow_follower_reads);
                let sequence = in_flight.sequence_number();
                PlannedOp {
                    in_flight,
                    shard,
                    group,
                    sequence,
                }
            })
            .collect();

        // Shards define the dispatch units; the group picks the endpoint and
        // consistency; the sequence keeps writes deterministic within both.
        ops.sort_by(|a, b| {
            (Arc::as_ptr(&a.shard) as usize, a.group, a.sequence).cmp(&(
                Arc::as_ptr(&b.shard) as usize,
                b.group,
                b.sequence,
            ))
        });

        let max_sidecars = self.transport.max_sidecar_slices();
        let mut start = 0usize;
        let mut start_group = ops[0].group;
        let mut num_sidecars = 0usize;
        for index in 0..ops.len() {
            let group = ops[index].group;
            // Close the current run when the shard or group changes, or when
            // it already holds as many sidecar-bearing ops as one call may
            // carry.
            if !Arc::ptr_eq(&ops[index].shard, &ops[start].shard)
                || group != start_group
                || num_sidecars >= max_sidecars
            {
                // A further run exists, so the batch did not fit in one call
                // and the runs must agree on a read time.
                self.flush_buffer(
                    &ops[start..index],
                    false,
                    true,
                    deadline,
                    transaction_metadata.clone(),
                );
                start = index;
                start_group = group;
                num_sidecars = 0;
            }
            if ops[index].in_flight.op().returns_rows() {
                num_sidecars += 1;
            }
        }

        // Consistent read is not required when the whole batch fit into a
        // single call.
        let need_consistent_read = force_consistent_read || start != 0;
        self.flush_buffer(
            &ops[start..],
            true,
            need_consistent_read,
            deadline,
            transaction_metadata,
        );
    }

    /// Turn one run into a consolidated call and send it. The call takes
    /// custody of the run's ops until its completion path returns them.
    fn flush_buffer(
        &self,
        run: &[PlannedOp],
        allow_local: bool,
        need_consistent_read: bool,
        deadline: Instant,
        transaction: Option<TransactionMetadata>,
    ) {
        assert!(!run.is_empty(), "dispatch run must not be empty");
        let shard = run[0].shard.clone();
        let group = run[0].group;
        tracing::debug!(
            shard_id = shard.shard_id,
            ops = run.len(),
            group = ?group,
            allow_local,
            need_consistent_read,
            "dispatching run"
        );

        let data = RpcData {
            batcher: self.strong(),
            shard,
            allow_local,
            need_consistent_read,
            transaction,
            deadline,
            ops: run.iter().map(|op| op.in_flight.clone()).collect(),
        };
        match group {
            OpGroup::Write => WriteRpc { data }.send(),
            OpGroup::LeaderRead => ReadRpc {
                data,
                consistency: ConsistencyLevel::Strong,
            }
            .send(),
            OpGroup::ConsistentPrefixRead => ReadRpc {
                data,
                consistency: ConsistencyLevel::ConsistentPrefix,
            }
            .send(),
        }
    }

    /// Write completion: map per-row errors back onto the run's ops, then
    /// run the common settle path.
    pub(crate) fn process_write_response(&self, rpc: &WriteRpc, result: Result<WriteResponse>) {
        let status: Result<()> = match &result {
            Ok(_) => Ok(()),
            Err(error) => Err(error.clone()),
        };
        let mut notify: SinkNotifications = Vec::new();

        match &result {
            Err(error) => self.fail_rpc_ops(&rpc.data.ops, error, &mut notify),
            Ok(response) => {
                for row_error in &response.per_row_errors {
                    if row_error.row_index >= rpc.data.ops.len() {
                        tracing::error!(
                            row_index = row_error.row_index,
                            sent = rpc.data.ops.len(),
                            shard_id = rpc.data.shard.shard_id,
                            "per-row error with an out-of-range index"
                        );
                        continue;
                    }
                    let in_flight = &rpc.data.ops[row_error.row_index];
                    tracing::debug!(
                        seq = in_flight.sequence_number(),
                        error = %row_error.error,
                        "row failed"
                    );
                    let mut inner = self.inner.lock().unwrap();
                    in_flight.set_state(OpState::Failed);
                    self.combine_error(&mut inner, in_flight, row_error.error.clone(), &mut notify);
                }
                for in_flight in &rpc.data.ops {
                    if in_flight.state() != OpState::Failed {
                        in_flight.set_state(OpState::Completed);
                    }
                }
            }
        }
        self.deliver_sink(notify);

        let (propagated, used_read_time) = match &result {
            Ok(response) => (response.propagated_hybrid_time, response.used_read_time),
            Err(_) => (None, None),
        };
        self.finish_rpc(&rpc.data.ops, status, used_read_time, propagated);
    }

    /// Read completion: only call-level failures map back at this layer.
    pub(crate) fn process_read_response(&self, rpc: &ReadRpc, result: Result<ReadResponse>) {
        let status: Result<()> = match &result {
            Ok(_) => Ok(()),
            Err(error) => Err(error.clone()),
        };
        let mut notify: SinkNotifications = Vec::new();

        match &result {
            Err(error) => self.fail_rpc_ops(&rpc.data.ops, error, &mut notify),
            Ok(_) => {
                for in_flight in &rpc.data.ops {
                    in_flight.set_state(OpState::Completed);
                }
            }
        }
        self.deliver_sink(notify);

        let (propagated, used_read_time) = match &result {
            Ok(response) => (response.propagated_hybrid_time, response.used_read_time),
            Err(_) => (None, None),
        };
        self.finish_rpc(&rpc.data.ops, status, used_read_time, propagated);
    }

    /// Record a call-level failure against every op the call carried.
    fn fail_rpc_ops(&self, ops: &[Arc<InFlightOp>], error: &Error, notify: &mut SinkNotifications) {
        let mut inner = self.inner.lock().unwrap();
        for in_flight in ops {
            in_flight.set_state(OpState::Failed);
            self.combine_error(&mut inner, in_flight, error.clone(), notify);
        }
    }

    /// Common settle path for every completed call.
    fn finish_rpc(
        &self,
        ops: &[Arc<InFlightOp>],
        status: Result<()>,
        used_read_time: Option<ReadTime>,
        propagated: Option<HybridTime>,
    ) {
        {
            let mut inner = self.inner.lock().unwrap();
            for in_flight in ops {
                let removed = inner.ops.remove(&in_flight.sequence_number());
                assert!(
                    removed.is_some(),
                    "op {} missing from the in-flight set",
                    in_flight.sequence_number()
                );
            }
        }

        if let Some(transaction) = &self.transaction {
            transaction.flushed(ops, used_read_time, &status);
        }
        if status.is_ok() {
            if let (Some(read_point), Some(propagated)) = (&self.read_point, propagated) {
                read_point.update_clock(propagated);
            }
        }

        self.check_for_finished_flush();
    }

    /// Terminal rendezvous: once the flush has started and the in-flight set
    /// drains, settle the batch exactly once.
    fn check_for_finished_flush(&self) {
        let (callback, status) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != BatcherState::Flushing || !inner.ops.is_empty() {
                return;
            }
            inner.state = BatcherState::Flushed;

            let status = if let Some(error) = inner.combined_error.clone() {
                Err(error)
            } else if self.had_errors.load(Ordering::Acquire) {
                // The caller is expected to drain the details from the
                // error sink.
                Err(Error::FlushFailed)
            } else {
                Ok(())
            };
            (inner.flush_callback.take(), status)
        };

        if let Some(callback) = callback {
            self.run_callback(callback, status);
        }
    }

    /// Hand the terminal callback to the executor; run it inline on the
    /// completing thread when the handoff fails or no executor is attached.
    fn run_callback(&self, callback: FlushCallback, status: Result<()>) {
        let task: CallbackTask = Box::new(move || callback(status));
        match &self.executor {
            Some(executor) => {
                if let Err(task) = executor.submit(task) {
                    task();
                }
            }
            None => task(),
        }
    }

    /// Remove a never-dispatched op from the in-flight set and record its
    /// failure. Caller holds the batcher lock and delivers `notify` after
    /// releasing it.
    fn mark_in_flight_op_failed(
        &self,
        inner: &mut Inner,
        op: &Arc<InFlightOp>,
        error: Error,
        notify: &mut SinkNotifications,
    ) {
        let removed = inner.ops.remove(&op.sequence_number());
        assert!(
            removed.is_some(),
            "op {} missing from the in-flight set",
            op.sequence_number()
        );
        op.set_state(OpState::Failed);
        self.combine_error(inner, op, error, notify);
    }

    /// Queue the sink notification and fold the failure into the batch
    /// status under the configured aggregation rule.
    fn combine_error(
        &self,
        inner: &mut Inner,
        op: &Arc<InFlightOp>,
        error: Error,
        notify: &mut SinkNotifications,
    ) {
        notify.push((op.op().clone(), error.clone()));
        if self.config.combine_errors {
            match &inner.combined_error {
                None => inner.combined_error = Some(error),
                Some(existing)
                    if existing.kind() != ErrorKind::Combined
                        && existing.kind() != error.kind() =>
                {
                    inner.combined_error = Some(Error::Combined);
                }
                Some(_) => {}
            }
        }
        self.had_errors.store(true, Ordering::Release);
    }

    fn deliver_sink(&self, notify: SinkNotifications) {
        for (op, error) in notify {
            self.error_sink.add_error(&op, error);
        }
    }
}

impl Drop for Batcher {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap();
        if !inner.ops.is_empty() {
            for op in inner.ops.values() {
                tracing::error!(
                    seq = op.sequence_number(),
                    state = ?op.state(),
                    "orphaned op at batcher drop"
                );
            }
        }
        debug_assert!(
            inner.ops.is_empty(),
            "batcher dropped with {} ops in flight",
            inner.ops.len()
        );
    }
}
