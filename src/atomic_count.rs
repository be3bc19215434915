use std::fmt;

/// A reference count which may be adjusted from many threads at once.
///
/// A new count starts at 1, representing the creator's reference. Every
/// operation is linearizable with respect to all other operations on the same
/// count. Prefix operations return the value after the update; postfix
/// operations return the value before it.
///
/// Nothing prevents decrementing below zero; the value then wraps. The owner
/// is expected to drop the count only once it has reached zero, and debug
/// builds assert that it has.
///
/// The count occupies its own cache line so that unrelated writes next to it
/// do not contend with it.
#[repr(align(64))]
pub struct AtomicCount {
    inner: imp::Count,
}

impl AtomicCount {
    /// Creates a count holding one reference.
    pub fn new() -> AtomicCount {
        AtomicCount { inner: imp::Count::new(1) }
    }

    /// Increments the count, returning the new value.
    #[inline]
    pub fn increment(&self) -> usize {
        self.inner.fetch_add(1).wrapping_add(1)
    }

    /// Decrements the count, returning the new value.
    #[inline]
    pub fn decrement(&self) -> usize {
        self.inner.fetch_sub(1).wrapping_sub(1)
    }

    /// Increments the count, returning the previous value.
    #[inline]
    pub fn post_increment(&self) -> usize {
        self.inner.fetch_add(1)
    }

    /// Decrements the count, returning the previous value.
    #[inline]
    pub fn post_decrement(&self) -> usize {
        self.inner.fetch_sub(1)
    }

    /// A snapshot of the current value, possibly stale by the time it is
    /// inspected.
    #[inline]
    pub fn get(&self) -> usize {
        self.inner.load()
    }
}

impl Default for AtomicCount {
    fn default() -> AtomicCount {
        AtomicCount::new()
    }
}

impl fmt::Debug for AtomicCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCount").field(&self.get()).finish()
    }
}

impl Drop for AtomicCount {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert_eq!(self.get(), 0, "AtomicCount dropped with outstanding references");
        }
    }
}

#[cfg(target_has_atomic = "ptr")]
mod imp {
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct Count(AtomicUsize);

    impl Count {
        pub fn new(value: usize) -> Count {
            Count(AtomicUsize::new(value))
        }
        #[inline]
        pub fn fetch_add(&self, n: usize) -> usize {
            self.0.fetch_add(n, Ordering::SeqCst)
        }
        #[inline]
        pub fn fetch_sub(&self, n: usize) -> usize {
            self.0.fetch_sub(n, Ordering::SeqCst)
        }
        #[inline]
        pub fn load(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }
}

// Without native atomics an OS mutex guards each read-modify-write. It is
// never held across anything but the update itself.
#[cfg(not(target_has_atomic = "ptr"))]
mod imp {
    use std::cell::UnsafeCell;

    use crate::sys;

    pub struct Count {
        lock: Box<sys::Mutex>,
        value: UnsafeCell<usize>,
    }

    unsafe impl Send for Count {}
    unsafe impl Sync for Count {}

    impl Count {
        pub fn new(value: usize) -> Count {
            Count { lock: Box::new(unsafe { sys::Mutex::new() }), value: UnsafeCell::new(value) }
        }

        fn update(&self, f: impl FnOnce(usize) -> usize) -> usize {
            unsafe {
                self.lock.lock();
                let old = *self.value.get();
                *self.value.get() = f(old);
                self.lock.unlock();
                old
            }
        }

        pub fn fetch_add(&self, n: usize) -> usize {
            self.update(|v| v.wrapping_add(n))
        }
        pub fn fetch_sub(&self, n: usize) -> usize {
            self.update(|v| v.wrapping_sub(n))
        }
        pub fn load(&self) -> usize {
            self.update(|v| v)
        }
    }

    impl Drop for Count {
        fn drop(&mut self) {
            unsafe { self.lock.destroy() }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::AtomicCount;

    #[test]
    fn starts_at_one() {
        let c = AtomicCount::new();
        assert_eq!(c.get(), 1);
        assert_eq!(c.decrement(), 0);
    }

    #[test]
    fn prefix_and_postfix() {
        let c = AtomicCount::new();
        assert_eq!(c.increment(), 2);
        assert_eq!(c.post_increment(), 2);
        assert_eq!(c.get(), 3);
        assert_eq!(c.post_decrement(), 3);
        assert_eq!(c.decrement(), 1);
        assert_eq!(c.post_decrement(), 1);
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn concurrent_updates_balance() {
        const T: usize = 16;
        const K: usize = 1_000;

        let c = Arc::new(AtomicCount::new());
        let threads: Vec<_> = (0..T).map(|_| {
            let c = c.clone();
            thread::spawn(move || {
                for _ in 0..K {
                    let up = c.increment();
                    assert!(up >= 2 && up <= 1 + T * K);
                    let down = c.decrement();
                    assert!(down >= 1 && down < T * K + 1);
                }
            })
        }).collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(c.get(), 1);
        assert_eq!(c.decrement(), 0);
    }

    #[test]
    fn post_operations_balance() {
        const T: usize = 8;
        const K: usize = 1_000;

        let c = Arc::new(AtomicCount::new());
        let threads: Vec<_> = (0..T).map(|_| {
            let c = c.clone();
            thread::spawn(move || {
                for _ in 0..K {
                    assert!(c.post_increment() >= 1);
                    assert!(c.post_decrement() >= 2);
                }
            })
        }).collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(c.post_decrement(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outstanding references")]
    fn drop_with_references_asserts() {
        drop(AtomicCount::new());
    }
}
