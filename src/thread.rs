//! Operations on OS threads: spawning, joining, yielding, priorities and
//! interruption.
//!
//! Every thread started here runs its task through a common trampoline which
//! installs the thread's interruption flag, runs the task, and lets the thread
//! exit normally even if the task panics.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::error::ResourceError;
use crate::sys;

/// A unit of work with a single entry point.
///
/// Implemented for every `FnOnce() + Send + 'static` closure.
pub trait Runnable: Send + 'static {
    fn run(self);
}

impl<F> Runnable for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self) {
        self()
    }
}

/// Abstract scheduling priority, translated to the platform's native range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

thread_local! {
    static INTERRUPT: RefCell<Option<Arc<AtomicBool>>> = const { RefCell::new(None) };
}

/// A handle to a thread started by `spawn`.
///
/// The handle can be joined once. Dropping it without joining detaches the
/// thread, which then cleans up after itself when its task returns.
pub struct Thread {
    native: sys::Thread,
    interrupt: Arc<AtomicBool>,
}

/// Starts a new OS thread running `task`.
///
/// Fails only if the operating system refuses to create the thread, typically
/// through resource exhaustion.
pub fn spawn<R: Runnable>(task: R) -> Result<Thread, ResourceError> {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    match sys::Thread::new(Box::new(move || dispatch(task, flag))) {
        Ok(native) => {
            trace!("spawned thread");
            Ok(Thread { native, interrupt })
        }
        Err(err) => {
            warn!(error = %err, "failed to spawn thread");
            Err(ResourceError::Spawn(err))
        }
    }
}

fn dispatch<R: Runnable>(task: R, interrupt: Arc<AtomicBool>) {
    INTERRUPT.with(|f| *f.borrow_mut() = Some(interrupt));

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        error!(panic = panic_message(&*payload), "task panicked");
    }
    trace!("thread exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<dyn Any>"
    }
}

impl Thread {
    /// Blocks until the thread terminates.
    ///
    /// Everything the thread did happens-before this returns. The OS handle
    /// is released by this call whether or not the wait succeeds.
    pub fn join(self) -> Result<(), ResourceError> {
        self.native.join().map_err(|err| {
            warn!(error = %err, "failed to join thread");
            ResourceError::Join(err)
        })
    }

    /// Releases the handle without waiting for the thread.
    pub fn detach(self) {
        drop(self)
    }

    /// Sets the thread's scheduling priority.
    #[cfg(feature = "priority")]
    pub fn set_priority(&self, priority: Priority) -> Result<(), ResourceError> {
        self.native.set_priority(priority).map_err(|err| {
            warn!(error = %err, ?priority, "failed to set thread priority");
            ResourceError::Priority(err)
        })
    }

    /// Reads the thread's scheduling priority.
    #[cfg(feature = "priority")]
    pub fn priority(&self) -> Result<Priority, ResourceError> {
        self.native.priority().map_err(|err| {
            warn!(error = %err, "failed to read thread priority");
            ResourceError::Priority(err)
        })
    }

    /// Priority support is compiled out: this does nothing.
    #[cfg(not(feature = "priority"))]
    pub fn set_priority(&self, _priority: Priority) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Priority support is compiled out: every thread reports `Medium`.
    #[cfg(not(feature = "priority"))]
    pub fn priority(&self) -> Result<Priority, ResourceError> {
        Ok(Priority::Medium)
    }

    /// Asks the thread to stop what it is waiting for.
    ///
    /// This only raises a flag. It is observed the next time the thread calls
    /// `interrupted`, for example through `Executor::wait`.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("interrupted", &self.interrupt.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Relinquishes the rest of the calling thread's time slice.
///
/// Uses the platform's "switch to another ready thread" facility when one is
/// available, falling back to a zero-length sleep. Which one is used is
/// decided once per process.
pub fn yield_now() {
    sys::yield_now()
}

/// Returns whether the calling thread has been interrupted, clearing the
/// interruption in the process.
///
/// Threads not started by `spawn` are never interrupted.
pub fn interrupted() -> bool {
    INTERRUPT.with(|f| match &*f.borrow() {
        Some(flag) => flag.swap(false, Ordering::AcqRel),
        None => false,
    })
}
