//! pthread and scheduler bindings used by the unix backends.
//!
//! Everything here is re-exported from `libc`; this module only exists so the
//! backends can name their primitives through a single `ffi` path on every
//! platform.

pub use libc::{c_int, c_void, pthread_mutex_t, pthread_mutexattr_t, pthread_t};
pub use libc::{timespec, PTHREAD_MUTEX_INITIALIZER, PTHREAD_MUTEX_RECURSIVE};

pub use libc::{
    pthread_mutex_destroy, pthread_mutex_init, pthread_mutex_lock, pthread_mutex_trylock,
    pthread_mutex_unlock, pthread_mutexattr_destroy, pthread_mutexattr_init,
    pthread_mutexattr_settype,
};

pub use libc::{pthread_create, pthread_detach, pthread_join};
pub use libc::{nanosleep, sched_yield};

#[cfg(feature = "priority")]
pub use libc::{
    pthread_getschedparam, pthread_setschedparam, sched_get_priority_max,
    sched_get_priority_min, sched_param,
};
