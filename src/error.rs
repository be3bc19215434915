//! Error types raised by thread operations and executors.

use std::io;

use thiserror::Error;

/// The operating system refused a thread operation.
///
/// These are never retried by this crate; the caller decides whether trying
/// again makes sense.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to join thread: {0}")]
    Join(#[source] io::Error),

    #[error("failed to translate thread priority: {0}")]
    Priority(#[source] io::Error),
}

/// A task was submitted to an executor that has been canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("executor has been canceled")]
pub struct CancellationError;

/// The calling thread was interrupted while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("thread was interrupted")]
pub struct InterruptedError;

/// Reasons `Executor::execute` can refuse a task.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Canceled(#[from] CancellationError),

    #[error(transparent)]
    Spawn(#[from] ResourceError),
}

impl ExecuteError {
    /// Whether the task was refused because the executor is canceled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ExecuteError::Canceled(_))
    }
}
