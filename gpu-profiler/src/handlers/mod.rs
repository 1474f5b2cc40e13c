//! Per-domain callback handlers
//!
//! Each handler module decodes one CUPTI payload shape into a typed event and
//! applies it to the host: either a point snapshot through the emitter or a
//! nested begin/end on the calling thread.

pub mod api;
pub mod nvtx;
pub mod resource;
pub mod sync;

use std::ffi::{c_char, CStr};

/// Bytes of a C string without the terminator. `None` for null.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
pub(crate) unsafe fn c_str_bytes<'a>(ptr: *const c_char) -> Option<&'a [u8]> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_bytes())
    }
}

/// Bytes of a C string including the terminator. `None` for null.
///
/// # Safety
/// Same as [`c_str_bytes`].
pub(crate) unsafe fn c_str_bytes_with_nul<'a>(ptr: *const c_char) -> Option<&'a [u8]> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_bytes_with_nul())
    }
}
