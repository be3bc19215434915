#![allow(non_camel_case_types)]

//! Unsafe, unchecked wrappers around the OS primitives backing this crate.
//!
//! Exactly one backend is compiled in, chosen by `#[cfg]`. Nothing in here
//! checks preconditions; the safe types at the top level of the crate are the
//! intended interface.

pub use self::mutex::{Mutex, ReentrantMutex};
pub use self::thread::{yield_now, Thread};

pub mod mutex;
pub mod thread;

#[cfg(unix)] #[path = "unix.rs"] mod ffi;
#[cfg(windows)] #[path = "windows.rs"] mod ffi;

#[cfg(not(any(unix, windows)))]
compile_error!("zsync only provides unix and windows backends");
