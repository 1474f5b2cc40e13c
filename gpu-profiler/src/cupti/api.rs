//! Vendor API seam
//!
//! Every CUPTI entry point the service uses goes through [`CuptiApi`] so the
//! adapter can run against the real library (`cuda` feature) or a test double.

use super::bindings::{self, CUptiResult, CUpti_CallbackFunc};
use crate::domain::CallbackDomain;
use crate::error::CuptiError;
use std::ffi::c_void;

/// Opaque `CUcontext`, kept as an address so it can be hashed and shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(usize);

impl ContextHandle {
    pub fn from_raw(ctx: bindings::CUcontext) -> Self {
        Self(ctx as usize)
    }

    pub fn as_raw(self) -> bindings::CUcontext {
        self.0 as bindings::CUcontext
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque `CUstream`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamHandle(usize);

impl StreamHandle {
    pub fn from_raw(stream: bindings::CUstream) -> Self {
        Self(stream as usize)
    }

    pub fn as_raw(self) -> bindings::CUstream {
        self.0 as bindings::CUstream
    }
}

/// Opaque `CUpti_SubscriberHandle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(usize);

impl SubscriberHandle {
    pub fn from_raw(handle: bindings::CUpti_SubscriberHandle) -> Self {
        Self(handle as usize)
    }

    pub fn as_raw(self) -> bindings::CUpti_SubscriberHandle {
        self.0 as bindings::CUpti_SubscriberHandle
    }
}

/// CUPTI callback API as consumed by the service.
///
/// The id queries are called from inside callbacks and must not block.
pub trait CuptiApi: Send + Sync {
    /// Register `callback` as the subscriber; `userdata` is passed back verbatim
    fn subscribe(
        &self,
        callback: CUpti_CallbackFunc,
        userdata: *mut c_void,
    ) -> Result<SubscriberHandle, CuptiError>;

    fn unsubscribe(&self, subscriber: SubscriberHandle) -> Result<(), CuptiError>;

    fn enable_domain(
        &self,
        subscriber: SubscriberHandle,
        domain: CallbackDomain,
    ) -> Result<(), CuptiError>;

    fn device_id(&self, context: ContextHandle) -> Result<u32, CuptiError>;

    fn context_id(&self, context: ContextHandle) -> Result<u32, CuptiError>;

    fn stream_id(&self, context: ContextHandle, stream: StreamHandle) -> Result<u32, CuptiError>;

    /// Release all CUPTI state after the last unsubscribe
    fn finalize(&self) -> Result<(), CuptiError>;

    /// Human-readable description of a result code
    fn result_string(&self, code: CUptiResult) -> String {
        bindings::result_name(code).to_string()
    }
}

/// [`CuptiApi`] backed by the linked CUPTI library
#[cfg(feature = "cuda")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SysCupti;

#[cfg(feature = "cuda")]
impl CuptiApi for SysCupti {
    fn subscribe(
        &self,
        callback: CUpti_CallbackFunc,
        userdata: *mut c_void,
    ) -> Result<SubscriberHandle, CuptiError> {
        let mut handle: bindings::CUpti_SubscriberHandle = std::ptr::null_mut();
        let res = unsafe { bindings::cuptiSubscribe(&mut handle, callback, userdata) };
        CuptiError::check("cuptiSubscribe", res)?;
        Ok(SubscriberHandle::from_raw(handle))
    }

    fn unsubscribe(&self, subscriber: SubscriberHandle) -> Result<(), CuptiError> {
        let res = unsafe { bindings::cuptiUnsubscribe(subscriber.as_raw()) };
        CuptiError::check("cuptiUnsubscribe", res)
    }

    fn enable_domain(
        &self,
        subscriber: SubscriberHandle,
        domain: CallbackDomain,
    ) -> Result<(), CuptiError> {
        let res = unsafe { bindings::cuptiEnableDomain(1, subscriber.as_raw(), domain.raw()) };
        CuptiError::check("cuptiEnableDomain", res)
    }

    fn device_id(&self, context: ContextHandle) -> Result<u32, CuptiError> {
        let mut id = 0u32;
        let res = unsafe { bindings::cuptiGetDeviceId(context.as_raw(), &mut id) };
        CuptiError::check("cuptiGetDeviceId", res).map(|_| id)
    }

    fn context_id(&self, context: ContextHandle) -> Result<u32, CuptiError> {
        let mut id = 0u32;
        let res = unsafe { bindings::cuptiGetContextId(context.as_raw(), &mut id) };
        CuptiError::check("cuptiGetContextId", res).map(|_| id)
    }

    fn stream_id(&self, context: ContextHandle, stream: StreamHandle) -> Result<u32, CuptiError> {
        // TODO: switch to cuptiGetStreamIdEx once CUDA < 8.0 support is dropped
        let mut id = 0u32;
        let res =
            unsafe { bindings::cuptiGetStreamId(context.as_raw(), stream.as_raw(), &mut id) };
        CuptiError::check("cuptiGetStreamId", res).map(|_| id)
    }

    fn finalize(&self) -> Result<(), CuptiError> {
        let res = unsafe { bindings::cuptiFinalize() };
        CuptiError::check("cuptiFinalize", res)
    }

    fn result_string(&self, code: CUptiResult) -> String {
        let mut s: *const std::ffi::c_char = std::ptr::null();
        let res = unsafe { bindings::cuptiGetResultString(code, &mut s) };
        if res != bindings::CUPTI_SUCCESS || s.is_null() {
            return bindings::result_name(code).to_string();
        }
        unsafe { std::ffi::CStr::from_ptr(s) }
            .to_string_lossy()
            .into_owned()
    }
}
