//! Low-level concurrency primitives over a uniform, platform-independent
//! layer: fast OS-backed locks, an atomic reference count, thread operations
//! and a thread-per-task executor.
//!
//! The lock types trade safety checks for speed. Their preconditions are
//! documented and never verified; higher level synchronization is expected to
//! be built on top of them.

pub use atomic_count::AtomicCount;
pub use error::{CancellationError, ExecuteError, InterruptedError, ResourceError};
pub use executor::{Executor, ThreadedExecutor};
pub use fast_mutex::FastMutex;
pub use fast_recursive_mutex::FastRecursiveMutex;
pub use lockable::{Guard, Lockable};
pub use thread::{Priority, Runnable, Thread};

pub mod thread;

mod atomic_count;
mod error;
mod executor;
mod fast_mutex;
mod fast_recursive_mutex;
mod lockable;
mod sys;
