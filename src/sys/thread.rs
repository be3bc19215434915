use std::io;
use std::mem::ManuallyDrop;
use std::sync::OnceLock;

#[cfg(feature = "priority")]
use crate::thread::Priority;

/// An OS thread handle.
///
/// The handle is released exactly once: by `join`, by `detach`, or by being
/// dropped (which detaches).
pub struct Thread(imp::Thread);

unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

/// Boxed entry point handed to the OS trampoline.
pub type Main = Box<dyn FnOnce() + Send + 'static>;

impl Thread {
    /// Starts a new OS thread running `main`.
    ///
    /// The trampoline reclaims `main`, calls it, and returns to the OS which
    /// tears the thread down. `main` must not unwind.
    pub fn new(main: Main) -> io::Result<Thread> {
        unsafe { imp::Thread::new(main).map(Thread) }
    }

    /// Blocks until the thread terminates and releases the OS handle.
    ///
    /// If the wait fails the handle is detached instead, so it is released
    /// exactly once either way.
    pub fn join(self) -> io::Result<()> {
        let this = ManuallyDrop::new(self);
        let r = unsafe { this.0.join() };
        if r.is_err() {
            unsafe { this.0.detach() }
        }
        r
    }

    #[cfg(feature = "priority")]
    pub fn set_priority(&self, priority: Priority) -> io::Result<()> {
        unsafe { self.0.set_priority(priority) }
    }

    #[cfg(feature = "priority")]
    pub fn priority(&self) -> io::Result<Priority> {
        unsafe { self.0.priority() }
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        unsafe { self.0.detach() }
    }
}

static YIELDER: OnceLock<imp::Yielder> = OnceLock::new();

/// Gives up the rest of the current time slice, using the best facility the
/// platform offers. The facility is detected on first use.
pub fn yield_now() {
    yielder().yield_now()
}

fn yielder() -> &'static imp::Yielder {
    YIELDER.get_or_init(imp::Yielder::detect)
}

#[cfg(unix)]
mod imp {
    use std::io;
    use std::mem;
    use std::ptr;

    use tracing::debug;

    use super::Main;
    use crate::sys::ffi;

    #[cfg(feature = "priority")]
    use crate::thread::Priority;

    pub struct Thread { id: ffi::pthread_t }

    impl Thread {
        pub unsafe fn new(main: Main) -> io::Result<Thread> {
            let p = Box::into_raw(Box::new(main));
            let mut native: ffi::pthread_t = mem::zeroed();
            let r = ffi::pthread_create(&mut native, ptr::null(), thread_start,
                                        p as *mut ffi::c_void);
            if r != 0 {
                // The thread never started, so the closure is still ours.
                drop(Box::from_raw(p));
                Err(io::Error::from_raw_os_error(r))
            } else {
                Ok(Thread { id: native })
            }
        }

        pub unsafe fn join(&self) -> io::Result<()> {
            match ffi::pthread_join(self.id, ptr::null_mut()) {
                0 => Ok(()),
                r => Err(io::Error::from_raw_os_error(r)),
            }
        }

        pub unsafe fn detach(&self) {
            // Only fails when the id no longer names a joinable thread, in
            // which case there is nothing left to release.
            ffi::pthread_detach(self.id);
        }

        #[cfg(feature = "priority")]
        pub unsafe fn set_priority(&self, priority: Priority) -> io::Result<()> {
            let (policy, mut param) = self.sched_param()?;
            let (min, max) = priority_range(policy)?;
            param.sched_priority = to_native(priority, min, max);
            match ffi::pthread_setschedparam(self.id, policy, &param) {
                0 => Ok(()),
                r => Err(io::Error::from_raw_os_error(r)),
            }
        }

        #[cfg(feature = "priority")]
        pub unsafe fn priority(&self) -> io::Result<Priority> {
            let (policy, param) = self.sched_param()?;
            let (min, max) = priority_range(policy)?;
            Ok(from_native(param.sched_priority, min, max))
        }

        #[cfg(feature = "priority")]
        unsafe fn sched_param(&self) -> io::Result<(ffi::c_int, ffi::sched_param)> {
            let mut policy = 0;
            let mut param: ffi::sched_param = mem::zeroed();
            match ffi::pthread_getschedparam(self.id, &mut policy, &mut param) {
                0 => Ok((policy, param)),
                r => Err(io::Error::from_raw_os_error(r)),
            }
        }
    }

    extern "C" fn thread_start(main: *mut ffi::c_void) -> *mut ffi::c_void {
        unsafe {
            let main = Box::from_raw(main as *mut Main);
            (*main)();
        }
        ptr::null_mut()
    }

    #[cfg(feature = "priority")]
    fn priority_range(policy: ffi::c_int) -> io::Result<(ffi::c_int, ffi::c_int)> {
        let min = unsafe { ffi::sched_get_priority_min(policy) };
        if min == -1 {
            return Err(io::Error::last_os_error());
        }
        let max = unsafe { ffi::sched_get_priority_max(policy) };
        if max == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok((min, max))
    }

    #[cfg(feature = "priority")]
    pub fn to_native(priority: Priority, min: ffi::c_int, max: ffi::c_int) -> ffi::c_int {
        match priority {
            Priority::Low => min,
            Priority::Medium => min + (max - min) / 2,
            Priority::High => max,
        }
    }

    #[cfg(feature = "priority")]
    pub fn from_native(native: ffi::c_int, min: ffi::c_int, max: ffi::c_int) -> Priority {
        let medium = min + (max - min) / 2;
        if native < medium {
            Priority::Low
        } else if native > medium {
            Priority::High
        } else {
            Priority::Medium
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    pub enum Yielder {
        SchedYield,
        Sleep,
    }

    impl Yielder {
        pub fn detect() -> Yielder {
            let yielder = if unsafe { ffi::sched_yield() } == 0 {
                Yielder::SchedYield
            } else {
                Yielder::Sleep
            };
            debug!(?yielder, "detected thread yield facility");
            yielder
        }

        pub fn yield_now(&self) {
            if *self == Yielder::SchedYield && unsafe { ffi::sched_yield() } == 0 {
                return;
            }
            let ts = ffi::timespec { tv_sec: 0, tv_nsec: 0 };
            unsafe { ffi::nanosleep(&ts, ptr::null_mut()) };
        }
    }
}

#[cfg(windows)]
mod imp {
    use std::ffi::c_char;
    use std::io;
    use std::mem;
    use std::ptr;

    use tracing::debug;

    use super::Main;
    use crate::sys::ffi;

    #[cfg(feature = "priority")]
    use crate::thread::Priority;

    pub struct Thread { handle: ffi::HANDLE }

    impl Thread {
        pub unsafe fn new(main: Main) -> io::Result<Thread> {
            let p = Box::into_raw(Box::new(main));
            let handle = ffi::CreateThread(ptr::null_mut(), 0, thread_start,
                                           p as ffi::LPVOID, 0, ptr::null_mut());
            if handle.is_null() {
                let err = io::Error::last_os_error();
                drop(Box::from_raw(p));
                Err(err)
            } else {
                Ok(Thread { handle })
            }
        }

        pub unsafe fn join(&self) -> io::Result<()> {
            if ffi::WaitForSingleObject(self.handle, ffi::INFINITE) != ffi::WAIT_OBJECT_0 {
                return Err(io::Error::last_os_error());
            }
            let r = ffi::CloseHandle(self.handle);
            debug_assert!(r != 0);
            Ok(())
        }

        pub unsafe fn detach(&self) {
            let r = ffi::CloseHandle(self.handle);
            debug_assert!(r != 0);
        }

        #[cfg(feature = "priority")]
        pub unsafe fn set_priority(&self, priority: Priority) -> io::Result<()> {
            let n = match priority {
                Priority::Low => ffi::THREAD_PRIORITY_BELOW_NORMAL,
                Priority::Medium => ffi::THREAD_PRIORITY_NORMAL,
                Priority::High => ffi::THREAD_PRIORITY_ABOVE_NORMAL,
            };
            if ffi::SetThreadPriority(self.handle, n) == 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        #[cfg(feature = "priority")]
        pub unsafe fn priority(&self) -> io::Result<Priority> {
            match ffi::GetThreadPriority(self.handle) {
                ffi::THREAD_PRIORITY_ERROR_RETURN => Err(io::Error::last_os_error()),
                ffi::THREAD_PRIORITY_BELOW_NORMAL => Ok(Priority::Low),
                ffi::THREAD_PRIORITY_ABOVE_NORMAL => Ok(Priority::High),
                _ => Ok(Priority::Medium),
            }
        }
    }

    unsafe extern "system" fn thread_start(main: ffi::LPVOID) -> ffi::DWORD {
        let main = Box::from_raw(main as *mut Main);
        (*main)();
        0
    }

    type SwitchToThread = unsafe extern "system" fn() -> ffi::BOOL;

    // SwitchToThread is looked up rather than linked so that a missing export
    // degrades to Sleep(0).
    pub struct Yielder { switch_to_thread: Option<SwitchToThread> }

    impl Yielder {
        pub fn detect() -> Yielder {
            let switch_to_thread = unsafe {
                let module = ffi::GetModuleHandleA(b"kernel32.dll\0".as_ptr() as *const c_char);
                if module.is_null() {
                    None
                } else {
                    ffi::GetProcAddress(module, b"SwitchToThread\0".as_ptr() as *const c_char)
                        .map(|f| mem::transmute::<_, SwitchToThread>(f))
                }
            };
            debug!(switch_to_thread = switch_to_thread.is_some(),
                   "detected thread yield facility");
            Yielder { switch_to_thread }
        }

        pub fn yield_now(&self) {
            let switched = match self.switch_to_thread {
                Some(f) => unsafe { f() != 0 },
                None => false,
            };
            if !switched {
                unsafe { ffi::Sleep(0) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::{yield_now, yielder, Thread};

    #[test]
    fn join_runs_main() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let t = Thread::new(Box::new(move || ran2.store(true, Ordering::Relaxed))).unwrap();
        t.join().unwrap();
        assert!(ran.load(Ordering::Relaxed));
    }

    #[test]
    fn drop_detaches() {
        let (tx, rx) = std::sync::mpsc::channel();
        let t = Thread::new(Box::new(move || tx.send(()).unwrap())).unwrap();
        drop(t);
        rx.recv().unwrap();
    }

    #[test]
    fn yield_detection_happens_once() {
        let a = yielder();
        yield_now();
        let b = yielder();
        assert!(std::ptr::eq(a, b));
    }

    #[cfg(all(unix, feature = "priority"))]
    #[test]
    fn native_priority_mapping() {
        use super::imp::{from_native, to_native};
        use crate::thread::Priority;

        assert_eq!(to_native(Priority::Low, 1, 99), 1);
        assert_eq!(to_native(Priority::Medium, 1, 99), 50);
        assert_eq!(to_native(Priority::High, 1, 99), 99);

        assert_eq!(from_native(1, 1, 99), Priority::Low);
        assert_eq!(from_native(30, 1, 99), Priority::Low);
        assert_eq!(from_native(50, 1, 99), Priority::Medium);
        assert_eq!(from_native(99, 1, 99), Priority::High);

        // SCHED_OTHER on linux has a single level
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(to_native(p, 0, 0), 0);
        }
        assert_eq!(from_native(0, 0, 0), Priority::Medium);
    }
}
