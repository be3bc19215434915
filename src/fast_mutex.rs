use std::fmt;
use std::time::Duration;

use crate::lockable::Lockable;
use crate::sys;

/// A small, fast, non-recursive mutual exclusion lock.
///
/// This is the least expensive `Lockable` in the crate, and it gets there by
/// giving up every safety check:
///
/// * acquiring a `FastMutex` already held by the current thread deadlocks
///   that thread against itself;
/// * releasing a `FastMutex` that is not held is undefined behavior;
/// * dropping a `FastMutex` while it is held is undefined behavior.
///
/// None of these are detected or reported. Reserve it for short critical
/// sections. Scheduling of waiters is left to the operating system.
///
/// # Example
///
/// ```rust
/// use zsync::{FastMutex, Lockable};
///
/// let m = FastMutex::new();
/// let guard = m.lock();
/// // do some work
/// drop(guard); // unlock the lock
/// ```
pub struct FastMutex {
    // The OS mutex may not move once it has been used, while a FastMutex may
    // be moved at any time, so the native lock lives behind a box to give it a
    // constant address.
    lock: Box<sys::Mutex>,
}

impl FastMutex {
    /// Creates a new mutex in an unlocked state ready for use.
    pub fn new() -> FastMutex {
        FastMutex { lock: Box::new(unsafe { sys::Mutex::new() }) }
    }
}

impl Lockable for FastMutex {
    /// Acquires exclusive access. No safety or state checks are performed.
    ///
    /// The caller must not already hold this lock.
    fn acquire(&self) {
        unsafe { self.lock.lock() }
    }

    /// Releases exclusive access. No safety or state checks are performed.
    unsafe fn release(&self) {
        self.lock.unlock()
    }

    /// Makes a single non-blocking attempt to acquire the lock.
    ///
    /// `timeout` is ignored: this returns immediately with `true` if the lock
    /// was acquired and `false` if it is held elsewhere. Bounded waiting is
    /// not offered because a `FastMutex` only guards sections short enough
    /// that waiting for one is never worth a timer.
    fn try_acquire(&self, _timeout: Duration) -> bool {
        unsafe { self.lock.try_lock() }
    }
}

impl Default for FastMutex {
    fn default() -> FastMutex {
        FastMutex::new()
    }
}

impl fmt::Debug for FastMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastMutex").finish_non_exhaustive()
    }
}

impl Drop for FastMutex {
    fn drop(&mut self) {
        // This is actually safe b/c we know that there is no further usage of
        // this mutex (it's up to the user to arrange for a mutex to get
        // dropped, that's not our job)
        unsafe { self.lock.destroy() }
    }
}
