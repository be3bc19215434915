#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

pub type BOOL = c_int;
pub type BOOLEAN = u8;
pub type DWORD = u32;
pub type HANDLE = *mut c_void;
pub type HMODULE = *mut c_void;
pub type LPVOID = *mut c_void;
pub type LONG = i32;
pub type ULONG_PTR = usize;
pub type FARPROC = Option<unsafe extern "system" fn() -> isize>;
pub type LPTHREAD_START_ROUTINE = unsafe extern "system" fn(LPVOID) -> DWORD;

pub type LPCRITICAL_SECTION = *mut CRITICAL_SECTION;
pub type PSRWLOCK = *mut SRWLOCK;

pub const INFINITE: DWORD = 0xFFFF_FFFF;
pub const WAIT_OBJECT_0: DWORD = 0;

pub const THREAD_PRIORITY_BELOW_NORMAL: c_int = -1;
pub const THREAD_PRIORITY_NORMAL: c_int = 0;
pub const THREAD_PRIORITY_ABOVE_NORMAL: c_int = 1;
pub const THREAD_PRIORITY_ERROR_RETURN: c_int = 0x7FFF_FFFF;

#[repr(C)]
pub struct SRWLOCK { pub ptr: LPVOID }

pub const SRWLOCK_INIT: SRWLOCK = SRWLOCK { ptr: std::ptr::null_mut() };

#[repr(C)]
pub struct CRITICAL_SECTION {
    pub DebugInfo: LPVOID,
    pub LockCount: LONG,
    pub RecursionCount: LONG,
    pub OwningThread: HANDLE,
    pub LockSemaphore: HANDLE,
    pub SpinCount: ULONG_PTR,
}

#[link(name = "kernel32")]
extern "system" {
    pub fn AcquireSRWLockExclusive(SRWLock: PSRWLOCK);
    pub fn ReleaseSRWLockExclusive(SRWLock: PSRWLOCK);
    pub fn TryAcquireSRWLockExclusive(SRWLock: PSRWLOCK) -> BOOLEAN;

    pub fn InitializeCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn DeleteCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn EnterCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn LeaveCriticalSection(lpCriticalSection: LPCRITICAL_SECTION);
    pub fn TryEnterCriticalSection(lpCriticalSection: LPCRITICAL_SECTION) -> BOOL;

    pub fn CreateThread(lpThreadAttributes: LPVOID,
                        dwStackSize: usize,
                        lpStartAddress: LPTHREAD_START_ROUTINE,
                        lpParameter: LPVOID,
                        dwCreationFlags: DWORD,
                        lpThreadId: *mut DWORD) -> HANDLE;
    pub fn WaitForSingleObject(hHandle: HANDLE, dwMilliseconds: DWORD) -> DWORD;
    pub fn CloseHandle(hObject: HANDLE) -> BOOL;
    pub fn Sleep(dwMilliseconds: DWORD);

    pub fn SetThreadPriority(hThread: HANDLE, nPriority: c_int) -> BOOL;
    pub fn GetThreadPriority(hThread: HANDLE) -> c_int;

    pub fn GetModuleHandleA(lpModuleName: *const c_char) -> HMODULE;
    pub fn GetProcAddress(hModule: HMODULE, lpProcName: *const c_char) -> FARPROC;
}
