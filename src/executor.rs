//! Executors accept tasks and arrange for them to run elsewhere.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{CancellationError, ExecuteError, InterruptedError};
use crate::fast_mutex::FastMutex;
use crate::lockable::Lockable;
use crate::thread::{self, Runnable};

/// Something that runs submitted tasks.
///
/// An executor is either active or canceled. Cancellation is one-way: once
/// `cancel` has returned, every later `execute` fails. It does not stop tasks
/// that were already accepted.
pub trait Executor {
    /// Submits `task` for execution without waiting for it to run.
    ///
    /// Fails with `ExecuteError::Canceled` if the executor has been canceled.
    fn execute<R: Runnable>(&self, task: R) -> Result<(), ExecuteError>;

    /// Stops accepting new tasks.
    fn cancel(&self);

    /// Whether `cancel` has been called.
    fn is_canceled(&self) -> bool;

    /// Blocks until the executor's outstanding work is done.
    ///
    /// Fails if the calling thread is interrupted.
    fn wait(&self) -> Result<(), InterruptedError>;

    /// Like `wait`, giving up after `timeout`. Returns whether the work
    /// finished in time.
    fn wait_timeout(&self, timeout: Duration) -> Result<bool, InterruptedError>;
}

/// An executor which runs every task on a new thread of its own.
///
/// There is no queue and no limit on how many threads run at once, so this
/// suits short-lived tasks submitted at a modest rate. Threads are detached as
/// soon as they start; the executor keeps no record of them, so `wait` has
/// nothing to wait for and returns immediately.
///
/// `L` is the lock serializing submissions against cancellation.
///
/// # Example
///
/// ```rust
/// use std::sync::mpsc::channel;
/// use zsync::{Executor, ThreadedExecutor};
///
/// let executor: ThreadedExecutor = ThreadedExecutor::new();
/// let (tx, rx) = channel();
/// executor.execute(move || tx.send(42).unwrap()).unwrap();
/// assert_eq!(rx.recv().unwrap(), 42);
///
/// executor.cancel();
/// assert!(executor.execute(|| ()).unwrap_err().is_canceled());
/// ```
pub struct ThreadedExecutor<L = FastMutex> {
    lock: L,
    canceled: AtomicBool,
}

impl<L: Lockable + Default> ThreadedExecutor<L> {
    /// Creates an active executor.
    pub fn new() -> ThreadedExecutor<L> {
        ThreadedExecutor {
            lock: L::default(),
            canceled: AtomicBool::new(false),
        }
    }
}

impl<L: Lockable + Default> Default for ThreadedExecutor<L> {
    fn default() -> ThreadedExecutor<L> {
        ThreadedExecutor::new()
    }
}

impl<L: Lockable> Executor for ThreadedExecutor<L> {
    fn execute<R: Runnable>(&self, task: R) -> Result<(), ExecuteError> {
        // Canceled executors will not accept new tasks; checking before taking
        // the lock keeps the canceled state cheap.
        if self.canceled.load(Ordering::Acquire) {
            return Err(CancellationError.into());
        }

        let _guard = self.lock.lock();
        if self.canceled.load(Ordering::Acquire) {
            return Err(CancellationError.into());
        }

        thread::spawn(task)?.detach();
        trace!("task submitted on a new thread");
        Ok(())
    }

    fn cancel(&self) {
        let _guard = self.lock.lock();
        if !self.canceled.swap(true, Ordering::Release) {
            debug!("executor canceled");
        }
    }

    fn is_canceled(&self) -> bool {
        let _guard = self.lock.lock();
        self.canceled.load(Ordering::Acquire)
    }

    /// Every task is already running on its own thread, so there is nothing
    /// to wait for.
    fn wait(&self) -> Result<(), InterruptedError> {
        if thread::interrupted() {
            return Err(InterruptedError);
        }
        Ok(())
    }

    /// Returns `Ok(true)` at once, see `wait`.
    fn wait_timeout(&self, _timeout: Duration) -> Result<bool, InterruptedError> {
        if thread::interrupted() {
            return Err(InterruptedError);
        }
        Ok(true)
    }
}

impl<L> fmt::Debug for ThreadedExecutor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedExecutor")
            .field("canceled", &self.canceled.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread as std_thread;
    use std::time::{Duration, Instant};

    use super::{Executor, ThreadedExecutor};
    use crate::error::InterruptedError;
    use crate::{thread, FastRecursiveMutex};

    fn poll_until(deadline: Duration, mut f: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if f() {
                return true;
            }
            thread::yield_now();
        }
        f()
    }

    #[test]
    fn runs_task_on_another_thread() {
        let executor: ThreadedExecutor = ThreadedExecutor::new();
        let sentinel = Arc::new(AtomicBool::new(false));
        let s = sentinel.clone();

        executor.execute(move || s.store(true, Ordering::Release)).unwrap();
        assert!(poll_until(Duration::from_secs(10), || sentinel.load(Ordering::Acquire)));
    }

    #[test]
    fn wait_does_not_block_on_tasks() {
        let executor: ThreadedExecutor = ThreadedExecutor::new();
        let (tx, rx) = channel::<()>();
        executor.execute(move || drop(rx.recv())).unwrap();

        let start = Instant::now();
        executor.wait().unwrap();
        assert_eq!(executor.wait_timeout(Duration::from_secs(10)), Ok(true));
        assert!(start.elapsed() < Duration::from_secs(1));

        drop(tx);
    }

    #[test]
    fn canceled_rejects_everything() {
        let executor: ThreadedExecutor = ThreadedExecutor::new();
        assert!(!executor.is_canceled());
        executor.cancel();
        assert!(executor.is_canceled());

        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..1_000 {
            let ran = ran.clone();
            let err = executor.execute(move || { ran.fetch_add(1, Ordering::SeqCst); })
                .unwrap_err();
            assert!(err.is_canceled());
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(executor.is_canceled());
    }

    #[test]
    fn cancel_twice() {
        let executor: ThreadedExecutor = ThreadedExecutor::new();
        executor.cancel();
        executor.cancel();
        assert!(executor.is_canceled());
    }

    #[test]
    fn cancel_leaves_running_tasks_alone() {
        let executor: ThreadedExecutor = ThreadedExecutor::new();
        let (go_tx, go_rx) = channel();
        let (done_tx, done_rx) = channel();
        executor.execute(move || {
            go_rx.recv().unwrap();
            done_tx.send(()).unwrap();
        }).unwrap();

        executor.cancel();
        go_tx.send(()).unwrap();
        done_rx.recv().unwrap();
    }

    #[test]
    fn no_execute_succeeds_after_cancel_returns() {
        let executor: Arc<ThreadedExecutor> = Arc::new(ThreadedExecutor::new());
        let canceled = Arc::new(AtomicBool::new(false));

        let submitters: Vec<_> = (0..4).map(|_| {
            let executor = executor.clone();
            let canceled = canceled.clone();
            std_thread::spawn(move || loop {
                let after_cancel = canceled.load(Ordering::SeqCst);
                let r = executor.execute(|| ());
                if after_cancel {
                    assert!(r.unwrap_err().is_canceled());
                    break;
                }
            })
        }).collect();

        std_thread::sleep(Duration::from_millis(5));
        executor.cancel();
        canceled.store(true, Ordering::SeqCst);

        for s in submitters {
            s.join().unwrap();
        }
    }

    #[test]
    fn wait_reports_interruption() {
        let executor: Arc<ThreadedExecutor> = Arc::new(ThreadedExecutor::new());
        let (go_tx, go_rx) = channel();
        let (tx, rx) = channel();

        let e = executor.clone();
        let t = thread::spawn(move || {
            go_rx.recv().unwrap();
            let first = e.wait();
            let second = e.wait();
            tx.send((first, second)).unwrap();
        }).unwrap();

        t.interrupt();
        go_tx.send(()).unwrap();
        assert_eq!(rx.recv().unwrap(), (Err(InterruptedError), Ok(())));
        t.join().unwrap();
    }

    #[test]
    fn wait_timeout_reports_interruption() {
        let executor: Arc<ThreadedExecutor> = Arc::new(ThreadedExecutor::new());
        let (go_tx, go_rx) = channel();
        let (tx, rx) = channel();

        let e = executor.clone();
        let t = thread::spawn(move || {
            go_rx.recv().unwrap();
            tx.send(e.wait_timeout(Duration::from_millis(1))).unwrap();
        }).unwrap();

        t.interrupt();
        go_tx.send(()).unwrap();
        assert_eq!(rx.recv().unwrap(), Err(InterruptedError));
        t.join().unwrap();
    }

    #[test]
    fn recursive_lock_executor() {
        let executor = ThreadedExecutor::<FastRecursiveMutex>::new();
        let (tx, rx) = channel();
        for i in 0..8 {
            let tx = tx.clone();
            executor.execute(move || tx.send(i).unwrap()).unwrap();
        }
        drop(tx);
        let mut got: Vec<i32> = rx.iter().collect();
        got.sort();
        assert_eq!(got, (0..8).collect::<Vec<_>>());
    }
}
