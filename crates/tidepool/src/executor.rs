//! Thread-pool handoff for terminal flush callbacks.

use tokio::runtime::Handle;

/// A deferred unit of work: a terminal callback bound to its status.
pub type CallbackTask = Box<dyn FnOnce() + Send + 'static>;

/// Pool the batcher hands terminal callbacks to, so user code never runs on
/// the thread that completed the last RPC. A failed handoff returns the task
/// to the caller, which runs it inline.
pub trait CallbackExecutor: Send + Sync + 'static {
    fn submit(&self, task: CallbackTask) -> Result<(), CallbackTask>;
}

/// Executor that spawns callbacks onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioCallbackExecutor {
    handle: Handle,
}

impl TokioCallbackExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Capture the ambient runtime, if the caller is running inside one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl CallbackExecutor for TokioCallbackExecutor {
    fn submit(&self, task: CallbackTask) -> Result<(), CallbackTask> {
        self.handle.spawn(async move { task() });
        Ok(())
    }
}
