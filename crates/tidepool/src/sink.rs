//! Per-operation error accumulation.

use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::op::RowOp;

/// Accumulates per-operation failures for the caller to inspect after a
/// flush. The batcher only ever writes; it never reads back. Delivery always
/// happens with no batcher lock held, so implementations may re-enter the
/// batcher.
pub trait ErrorSink: Send + Sync + 'static {
    fn add_error(&self, op: &Arc<RowOp>, error: Error);
}

/// Default sink: a mutex-guarded list the session layer drains between
/// flushes.
#[derive(Debug, Default)]
pub struct CollectedErrors {
    errors: Mutex<Vec<(Arc<RowOp>, Error)>>,
}

impl CollectedErrors {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the accumulated errors without draining them.
    pub fn errors(&self) -> Vec<(Arc<RowOp>, Error)> {
        self.errors.lock().unwrap().clone()
    }

    /// Drain the accumulated errors.
    pub fn take(&self) -> Vec<(Arc<RowOp>, Error)> {
        std::mem::take(&mut *self.errors.lock().unwrap())
    }
}

impl ErrorSink for CollectedErrors {
    fn add_error(&self, op: &Arc<RowOp>, error: Error) {
        self.errors.lock().unwrap().push((op.clone(), error));
    }
}
