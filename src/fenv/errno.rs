//! The C library's thread-local error indicator.
//!
//! Some math libraries report domain and range errors through `errno` in
//! addition to (or instead of) exception flags. Access goes through `libc`'s
//! per-platform location function; on targets without one the indicator is
//! reported as unavailable.

use libc::c_int;

#[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
fn location() -> *mut c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn location() -> *mut c_int {
    unsafe { libc::__error() }
}

#[cfg(any(target_os = "openbsd", target_os = "netbsd"))]
fn location() -> *mut c_int {
    unsafe { libc::__errno() }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "emscripten",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd"
))]
mod imp {
    use super::location;

    pub const AVAILABLE: bool = true;

    #[inline(always)]
    pub fn get() -> i32 {
        // SAFETY: the location is valid for the lifetime of the thread.
        unsafe { location().read_volatile() }
    }

    #[inline(always)]
    pub fn clear() {
        // SAFETY: as above.
        unsafe { location().write_volatile(0) }
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "emscripten",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
mod imp {
    pub const AVAILABLE: bool = false;

    pub fn get() -> i32 {
        0
    }

    pub fn clear() {}
}

/// `true` if this target exposes `errno`.
pub fn is_available() -> bool {
    imp::AVAILABLE
}

/// Reads the calling thread's `errno`; `0` where unavailable.
#[inline(always)]
pub fn get() -> i32 {
    imp::get()
}

/// Resets the calling thread's `errno` to `0`.
#[inline(always)]
pub fn clear() {
    imp::clear()
}
