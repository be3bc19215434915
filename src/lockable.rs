use std::marker::PhantomData;
use std::time::Duration;

/// Something that provides exclusive access.
///
/// Implementations decide how strictly they honor the contract. The fast
/// locks in this crate perform no safety checks at all: see their
/// documentation for the exact preconditions.
pub trait Lockable {
    /// Blocks the calling thread until exclusive access is obtained.
    fn acquire(&self);

    /// Relinquishes exclusive access.
    ///
    /// # Safety
    ///
    /// The calling thread must currently hold the lock. Releasing a lock that
    /// is not held is undefined behavior.
    unsafe fn release(&self);

    /// Attempts to obtain exclusive access, waiting at most `timeout`.
    ///
    /// Returns whether the lock was acquired. On success the caller must later
    /// `release` it.
    fn try_acquire(&self, timeout: Duration) -> bool;

    /// Acquires the lock for the lifetime of the returned guard.
    fn lock(&self) -> Guard<'_, Self> {
        self.acquire();
        Guard::new(self)
    }

    /// Attempts to acquire the lock, see `try_acquire`. The lock is released
    /// when the guard is dropped.
    fn try_lock(&self, timeout: Duration) -> Option<Guard<'_, Self>> {
        if self.try_acquire(timeout) {
            Some(Guard::new(self))
        } else {
            None
        }
    }
}

/// An RAII implementation of a "scoped lock". When this structure is dropped
/// (falls out of scope), the lock will be released, including when the scope
/// is left by unwinding.
///
/// Guards cannot be sent to another thread: locks must be released by the
/// thread which acquired them.
#[must_use]
pub struct Guard<'a, L: Lockable + ?Sized> {
    lock: &'a L,
    marker: PhantomData<*const ()>,
}

impl<'a, L: Lockable + ?Sized> Guard<'a, L> {
    fn new(lock: &'a L) -> Guard<'a, L> {
        Guard { lock, marker: PhantomData }
    }
}

impl<L: Lockable + ?Sized> Drop for Guard<'_, L> {
    fn drop(&mut self) {
        unsafe { self.lock.release() }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::panic;
    use std::time::Duration;

    use super::Lockable;

    // Single-threaded bookkeeping lock for checking guard behavior.
    #[derive(Default)]
    struct Counting {
        held: Cell<bool>,
        releases: Cell<usize>,
    }

    impl Lockable for Counting {
        fn acquire(&self) {
            assert!(!self.held.replace(true));
        }
        unsafe fn release(&self) {
            assert!(self.held.replace(false));
            self.releases.set(self.releases.get() + 1);
        }
        fn try_acquire(&self, _timeout: Duration) -> bool {
            !self.held.replace(true)
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let l = Counting::default();
        {
            let _g = l.lock();
            assert!(l.held.get());
        }
        assert!(!l.held.get());
        assert_eq!(l.releases.get(), 1);
    }

    #[test]
    fn try_lock() {
        let l = Counting::default();
        let g = l.try_lock(Duration::ZERO);
        assert!(g.is_some());
        assert!(l.try_lock(Duration::ZERO).is_none());
        drop(g);
        assert_eq!(l.releases.get(), 1);
    }

    #[test]
    fn guard_releases_on_unwind() {
        let l = Counting::default();
        let r = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _g = l.lock();
            panic!("boom");
        }));
        assert!(r.is_err());
        assert!(!l.held.get());
        assert_eq!(l.releases.get(), 1);
    }
}
