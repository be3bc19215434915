/// An OS-based, non-recursive mutual exclusion lock.
///
/// This is the thinnest cross-platform wrapper around OS mutexes. All usage of
/// this mutex is unsafe and it is recommended to instead use `FastMutex` at the
/// top level of the crate instead of this type.
pub struct Mutex(imp::Mutex);

/// An OS-based mutual exclusion lock which may be re-locked by its owner.
///
/// Every `lock` (or successful `try_lock`) by the owning thread must be paired
/// with an `unlock` before another thread can acquire it.
pub struct ReentrantMutex(imp::ReentrantMutex);

unsafe impl Send for Mutex {}
unsafe impl Sync for Mutex {}

unsafe impl Send for ReentrantMutex {}
unsafe impl Sync for ReentrantMutex {}

impl Mutex {
    /// Creates a newly initialized mutex.
    ///
    /// Behavior is undefined if the mutex is moved after the first method is
    /// called on the mutex.
    #[inline]
    pub const unsafe fn new() -> Mutex { Mutex(imp::Mutex::new()) }

    /// Lock the mutex blocking the current thread until it is available.
    ///
    /// Locking a mutex already held by the current thread deadlocks.
    #[inline]
    pub unsafe fn lock(&self) { self.0.lock() }

    /// Attempt to lock the mutex without blocking, returning whether it was
    /// successfully acquired or not.
    #[inline]
    pub unsafe fn try_lock(&self) -> bool { self.0.try_lock() }

    /// Unlock the mutex.
    ///
    /// Behavior is undefined if the current thread does not actually hold the
    /// mutex.
    #[inline]
    pub unsafe fn unlock(&self) { self.0.unlock() }

    /// Deallocate all resources associated with this mutex.
    ///
    /// Behavior is undefined if there are current or will be future users of
    /// this mutex.
    #[inline]
    pub unsafe fn destroy(&self) { self.0.destroy() }
}

impl ReentrantMutex {
    /// Creates a mutex which must be passed to `init` before use.
    ///
    /// The OS primitive is only set up by `init`, so the value may be moved
    /// freely until then and never afterwards.
    #[inline]
    pub unsafe fn uninitialized() -> ReentrantMutex {
        ReentrantMutex(imp::ReentrantMutex::uninitialized())
    }

    /// Initializes the mutex in place. Must be called exactly once, after the
    /// mutex has reached its final address.
    #[inline]
    pub unsafe fn init(&self) { self.0.init() }

    #[inline]
    pub unsafe fn lock(&self) { self.0.lock() }

    #[inline]
    pub unsafe fn try_lock(&self) -> bool { self.0.try_lock() }

    /// Behavior is undefined if the current thread does not hold the mutex.
    #[inline]
    pub unsafe fn unlock(&self) { self.0.unlock() }

    #[inline]
    pub unsafe fn destroy(&self) { self.0.destroy() }
}

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::mem::MaybeUninit;

    use crate::sys::ffi;

    pub struct Mutex { inner: UnsafeCell<ffi::pthread_mutex_t> }

    impl Mutex {
        #[inline]
        pub const fn new() -> Mutex {
            // The default mutex type: relocking from the owner deadlocks and
            // nothing is error checked.
            Mutex { inner: UnsafeCell::new(ffi::PTHREAD_MUTEX_INITIALIZER) }
        }
        #[inline]
        pub unsafe fn lock(&self) {
            let r = ffi::pthread_mutex_lock(self.inner.get());
            debug_assert_eq!(r, 0);
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            let r = ffi::pthread_mutex_unlock(self.inner.get());
            debug_assert_eq!(r, 0);
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::pthread_mutex_trylock(self.inner.get()) == 0
        }
        #[inline]
        pub unsafe fn destroy(&self) {
            let r = ffi::pthread_mutex_destroy(self.inner.get());
            debug_assert_eq!(r, 0);
        }
    }

    pub struct ReentrantMutex { inner: UnsafeCell<ffi::pthread_mutex_t> }

    impl ReentrantMutex {
        pub unsafe fn uninitialized() -> ReentrantMutex {
            // Might be moved and address is changing it is better to avoid
            // initialization of potentially opaque OS data before it landed
            ReentrantMutex { inner: UnsafeCell::new(ffi::PTHREAD_MUTEX_INITIALIZER) }
        }

        pub unsafe fn init(&self) {
            let mut attr = MaybeUninit::<ffi::pthread_mutexattr_t>::uninit();
            let r = ffi::pthread_mutexattr_init(attr.as_mut_ptr());
            debug_assert_eq!(r, 0);
            let r = ffi::pthread_mutexattr_settype(attr.as_mut_ptr(),
                                                   ffi::PTHREAD_MUTEX_RECURSIVE);
            debug_assert_eq!(r, 0);
            let r = ffi::pthread_mutex_init(self.inner.get(), attr.as_ptr());
            debug_assert_eq!(r, 0);
            let r = ffi::pthread_mutexattr_destroy(attr.as_mut_ptr());
            debug_assert_eq!(r, 0);
        }
        #[inline]
        pub unsafe fn lock(&self) {
            let r = ffi::pthread_mutex_lock(self.inner.get());
            debug_assert_eq!(r, 0);
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            let r = ffi::pthread_mutex_unlock(self.inner.get());
            debug_assert_eq!(r, 0);
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::pthread_mutex_trylock(self.inner.get()) == 0
        }
        #[inline]
        pub unsafe fn destroy(&self) {
            let r = ffi::pthread_mutex_destroy(self.inner.get());
            debug_assert_eq!(r, 0);
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::cell::UnsafeCell;
    use std::mem::MaybeUninit;

    use crate::sys::ffi;

    // Slim reader/writer locks are used in exclusive mode only. They are not
    // recursive and need no teardown.
    pub struct Mutex { inner: UnsafeCell<ffi::SRWLOCK> }

    impl Mutex {
        #[inline]
        pub const fn new() -> Mutex {
            Mutex { inner: UnsafeCell::new(ffi::SRWLOCK_INIT) }
        }
        #[inline]
        pub unsafe fn lock(&self) {
            ffi::AcquireSRWLockExclusive(self.inner.get())
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::TryAcquireSRWLockExclusive(self.inner.get()) != 0
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            ffi::ReleaseSRWLockExclusive(self.inner.get())
        }
        #[inline]
        pub unsafe fn destroy(&self) {}
    }

    // Critical sections are recursive for their owning thread.
    pub struct ReentrantMutex {
        inner: UnsafeCell<MaybeUninit<ffi::CRITICAL_SECTION>>,
    }

    impl ReentrantMutex {
        pub unsafe fn uninitialized() -> ReentrantMutex {
            ReentrantMutex { inner: UnsafeCell::new(MaybeUninit::uninit()) }
        }
        pub unsafe fn init(&self) {
            ffi::InitializeCriticalSection(self.raw())
        }
        #[inline]
        pub unsafe fn lock(&self) {
            ffi::EnterCriticalSection(self.raw())
        }
        #[inline]
        pub unsafe fn try_lock(&self) -> bool {
            ffi::TryEnterCriticalSection(self.raw()) != 0
        }
        #[inline]
        pub unsafe fn unlock(&self) {
            ffi::LeaveCriticalSection(self.raw())
        }
        pub unsafe fn destroy(&self) {
            ffi::DeleteCriticalSection(self.raw())
        }

        #[inline]
        fn raw(&self) -> ffi::LPCRITICAL_SECTION {
            self.inner.get().cast()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mutex, ReentrantMutex};

    #[test]
    fn smoke() {
        static M: Mutex = unsafe { Mutex::new() };
        unsafe {
            M.lock();
            assert!(!M.try_lock_from_other_thread());
            M.unlock();
            assert!(M.try_lock());
            M.unlock();
        }
    }

    #[test]
    fn reentrant_smoke() {
        let m = Box::new(unsafe { ReentrantMutex::uninitialized() });
        unsafe {
            m.init();
            m.lock();
            m.lock();
            assert!(m.try_lock());
            m.unlock();
            m.unlock();
            m.unlock();
            m.destroy();
        }
    }

    impl Mutex {
        fn try_lock_from_other_thread(&'static self) -> bool {
            std::thread::spawn(move || {
                let acquired = unsafe { self.try_lock() };
                if acquired {
                    unsafe { self.unlock() }
                }
                acquired
            }).join().unwrap()
        }
    }
}
