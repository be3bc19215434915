use std::fmt;
use std::time::Duration;

use crate::lockable::Lockable;
use crate::sys;

/// A fast mutual exclusion lock which its owner may acquire repeatedly.
///
/// Each `acquire` (or successful `try_acquire`) made by the owning thread must
/// be matched by a `release` before any other thread can obtain the lock. The
/// hold count is kept by the operating system's recursive mutex: a pthread
/// mutex of type `PTHREAD_MUTEX_RECURSIVE` on unix, a critical section on
/// windows.
///
/// As with `FastMutex`, nothing is checked: releasing more times than
/// acquired, or from a thread that does not own the lock, is undefined
/// behavior.
pub struct FastRecursiveMutex {
    lock: Box<sys::ReentrantMutex>,
}

impl FastRecursiveMutex {
    /// Creates a new recursive mutex in an unlocked state.
    pub fn new() -> FastRecursiveMutex {
        let lock = Box::new(unsafe { sys::ReentrantMutex::uninitialized() });
        unsafe { lock.init() }
        FastRecursiveMutex { lock }
    }
}

impl Lockable for FastRecursiveMutex {
    /// Acquires the lock, returning immediately if the calling thread already
    /// owns it.
    fn acquire(&self) {
        unsafe { self.lock.lock() }
    }

    unsafe fn release(&self) {
        self.lock.unlock()
    }

    /// Makes a single non-blocking attempt; `timeout` is ignored.
    ///
    /// Succeeds if the lock is free or already owned by the calling thread.
    fn try_acquire(&self, _timeout: Duration) -> bool {
        unsafe { self.lock.try_lock() }
    }
}

impl Default for FastRecursiveMutex {
    fn default() -> FastRecursiveMutex {
        FastRecursiveMutex::new()
    }
}

impl fmt::Debug for FastRecursiveMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastRecursiveMutex").finish_non_exhaustive()
    }
}

impl Drop for FastRecursiveMutex {
    fn drop(&mut self) {
        unsafe { self.lock.destroy() }
    }
}
