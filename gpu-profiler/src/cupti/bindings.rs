//! CUPTI FFI bindings
//!
//! Hand-written subset of `cupti.h`, `cupti_callbacks.h` and the generated
//! NVTX metadata headers. Only the callback API surface used by the adapter is
//! declared. The `extern` blocks are only linked with the `cuda` feature.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]
#![allow(dead_code)]

use std::ffi::{c_char, c_void};

pub type CUptiResult = u32;
pub type CUpti_CallbackDomain = u32;
pub type CUpti_CallbackId = u32;
pub type CUpti_ApiCallbackSite = u32;
pub type CUpti_EventID = u32;
pub type CUpti_SubscriberHandle = *mut c_void;
pub type CUpti_EventGroup = *mut c_void;
pub type CUcontext = *mut c_void;
pub type CUstream = *mut c_void;
pub type CUresult = u32;

/// `CUpti_CallbackFunc`
pub type CUpti_CallbackFunc = unsafe extern "C" fn(
    userdata: *mut c_void,
    domain: CUpti_CallbackDomain,
    cbid: CUpti_CallbackId,
    cbdata: *const c_void,
);

// ── Result codes ─────────────────────────────────────────────────────────────

pub const CUPTI_SUCCESS: CUptiResult = 0;
pub const CUPTI_ERROR_INVALID_PARAMETER: CUptiResult = 1;
pub const CUPTI_ERROR_INVALID_DEVICE: CUptiResult = 2;
pub const CUPTI_ERROR_INVALID_CONTEXT: CUptiResult = 3;
pub const CUPTI_ERROR_INVALID_EVENT_DOMAIN_ID: CUptiResult = 4;
pub const CUPTI_ERROR_INVALID_EVENT_ID: CUptiResult = 5;
pub const CUPTI_ERROR_INVALID_EVENT_NAME: CUptiResult = 6;
pub const CUPTI_ERROR_INVALID_OPERATION: CUptiResult = 7;
pub const CUPTI_ERROR_OUT_OF_MEMORY: CUptiResult = 8;
pub const CUPTI_ERROR_HARDWARE: CUptiResult = 9;
pub const CUPTI_ERROR_PARAMETER_SIZE_NOT_SUFFICIENT: CUptiResult = 10;
pub const CUPTI_ERROR_API_NOT_IMPLEMENTED: CUptiResult = 11;
pub const CUPTI_ERROR_MAX_LIMIT_REACHED: CUptiResult = 12;
pub const CUPTI_ERROR_NOT_READY: CUptiResult = 13;
pub const CUPTI_ERROR_NOT_COMPATIBLE: CUptiResult = 14;
pub const CUPTI_ERROR_NOT_INITIALIZED: CUptiResult = 15;
pub const CUPTI_ERROR_INVALID_METRIC_ID: CUptiResult = 16;
pub const CUPTI_ERROR_INVALID_METRIC_NAME: CUptiResult = 17;
pub const CUPTI_ERROR_QUEUE_EMPTY: CUptiResult = 18;
pub const CUPTI_ERROR_INVALID_HANDLE: CUptiResult = 19;
pub const CUPTI_ERROR_INVALID_STREAM: CUptiResult = 20;
pub const CUPTI_ERROR_INVALID_KIND: CUptiResult = 21;
pub const CUPTI_ERROR_INVALID_EVENT_VALUE: CUptiResult = 22;
pub const CUPTI_ERROR_DISABLED: CUptiResult = 23;
pub const CUPTI_ERROR_INVALID_MODULE: CUptiResult = 24;
pub const CUPTI_ERROR_INVALID_METRIC_VALUE: CUptiResult = 25;
pub const CUPTI_ERROR_HARDWARE_BUSY: CUptiResult = 26;
pub const CUPTI_ERROR_NOT_SUPPORTED: CUptiResult = 27;
pub const CUPTI_ERROR_MULTIPLE_SUBSCRIBERS_NOT_SUPPORTED: CUptiResult = 39;
pub const CUPTI_ERROR_UNKNOWN: CUptiResult = 999;

/// Name of a result code, as `cuptiGetResultString` reports it.
///
/// Used when the library itself is unavailable to decode the code.
pub fn result_name(code: CUptiResult) -> &'static str {
    match code {
        CUPTI_SUCCESS => "CUPTI_SUCCESS",
        CUPTI_ERROR_INVALID_PARAMETER => "CUPTI_ERROR_INVALID_PARAMETER",
        CUPTI_ERROR_INVALID_DEVICE => "CUPTI_ERROR_INVALID_DEVICE",
        CUPTI_ERROR_INVALID_CONTEXT => "CUPTI_ERROR_INVALID_CONTEXT",
        CUPTI_ERROR_INVALID_EVENT_DOMAIN_ID => "CUPTI_ERROR_INVALID_EVENT_DOMAIN_ID",
        CUPTI_ERROR_INVALID_EVENT_ID => "CUPTI_ERROR_INVALID_EVENT_ID",
        CUPTI_ERROR_INVALID_EVENT_NAME => "CUPTI_ERROR_INVALID_EVENT_NAME",
        CUPTI_ERROR_INVALID_OPERATION => "CUPTI_ERROR_INVALID_OPERATION",
        CUPTI_ERROR_OUT_OF_MEMORY => "CUPTI_ERROR_OUT_OF_MEMORY",
        CUPTI_ERROR_HARDWARE => "CUPTI_ERROR_HARDWARE",
        CUPTI_ERROR_PARAMETER_SIZE_NOT_SUFFICIENT => "CUPTI_ERROR_PARAMETER_SIZE_NOT_SUFFICIENT",
        CUPTI_ERROR_API_NOT_IMPLEMENTED => "CUPTI_ERROR_API_NOT_IMPLEMENTED",
        CUPTI_ERROR_MAX_LIMIT_REACHED => "CUPTI_ERROR_MAX_LIMIT_REACHED",
        CUPTI_ERROR_NOT_READY => "CUPTI_ERROR_NOT_READY",
        CUPTI_ERROR_NOT_COMPATIBLE => "CUPTI_ERROR_NOT_COMPATIBLE",
        CUPTI_ERROR_NOT_INITIALIZED => "CUPTI_ERROR_NOT_INITIALIZED",
        CUPTI_ERROR_INVALID_METRIC_ID => "CUPTI_ERROR_INVALID_METRIC_ID",
        CUPTI_ERROR_INVALID_METRIC_NAME => "CUPTI_ERROR_INVALID_METRIC_NAME",
        CUPTI_ERROR_QUEUE_EMPTY => "CUPTI_ERROR_QUEUE_EMPTY",
        CUPTI_ERROR_INVALID_HANDLE => "CUPTI_ERROR_INVALID_HANDLE",
        CUPTI_ERROR_INVALID_STREAM => "CUPTI_ERROR_INVALID_STREAM",
        CUPTI_ERROR_INVALID_KIND => "CUPTI_ERROR_INVALID_KIND",
        CUPTI_ERROR_INVALID_EVENT_VALUE => "CUPTI_ERROR_INVALID_EVENT_VALUE",
        CUPTI_ERROR_DISABLED => "CUPTI_ERROR_DISABLED",
        CUPTI_ERROR_INVALID_MODULE => "CUPTI_ERROR_INVALID_MODULE",
        CUPTI_ERROR_INVALID_METRIC_VALUE => "CUPTI_ERROR_INVALID_METRIC_VALUE",
        CUPTI_ERROR_HARDWARE_BUSY => "CUPTI_ERROR_HARDWARE_BUSY",
        CUPTI_ERROR_NOT_SUPPORTED => "CUPTI_ERROR_NOT_SUPPORTED",
        CUPTI_ERROR_MULTIPLE_SUBSCRIBERS_NOT_SUPPORTED => {
            "CUPTI_ERROR_MULTIPLE_SUBSCRIBERS_NOT_SUPPORTED"
        }
        _ => "CUPTI_ERROR_UNKNOWN",
    }
}

// ── Callback domains ─────────────────────────────────────────────────────────

pub const CUPTI_CB_DOMAIN_INVALID: CUpti_CallbackDomain = 0;
pub const CUPTI_CB_DOMAIN_DRIVER_API: CUpti_CallbackDomain = 1;
pub const CUPTI_CB_DOMAIN_RUNTIME_API: CUpti_CallbackDomain = 2;
pub const CUPTI_CB_DOMAIN_RESOURCE: CUpti_CallbackDomain = 3;
pub const CUPTI_CB_DOMAIN_SYNCHRONIZE: CUpti_CallbackDomain = 4;
pub const CUPTI_CB_DOMAIN_NVTX: CUpti_CallbackDomain = 5;

// ── API callback sites ───────────────────────────────────────────────────────

pub const CUPTI_API_ENTER: CUpti_ApiCallbackSite = 0;
pub const CUPTI_API_EXIT: CUpti_ApiCallbackSite = 1;

// ── Resource callback ids ────────────────────────────────────────────────────

pub const CUPTI_CBID_RESOURCE_INVALID: CUpti_CallbackId = 0;
pub const CUPTI_CBID_RESOURCE_CONTEXT_CREATED: CUpti_CallbackId = 1;
pub const CUPTI_CBID_RESOURCE_CONTEXT_DESTROY_STARTING: CUpti_CallbackId = 2;
pub const CUPTI_CBID_RESOURCE_STREAM_CREATED: CUpti_CallbackId = 3;
pub const CUPTI_CBID_RESOURCE_STREAM_DESTROY_STARTING: CUpti_CallbackId = 4;
pub const CUPTI_CBID_RESOURCE_CU_INIT_FINISHED: CUpti_CallbackId = 5;
pub const CUPTI_CBID_RESOURCE_MODULE_LOADED: CUpti_CallbackId = 6;

// ── Synchronize callback ids ─────────────────────────────────────────────────

pub const CUPTI_CBID_SYNCHRONIZE_INVALID: CUpti_CallbackId = 0;
pub const CUPTI_CBID_SYNCHRONIZE_STREAM_SYNCHRONIZED: CUpti_CallbackId = 1;
pub const CUPTI_CBID_SYNCHRONIZE_CONTEXT_SYNCHRONIZED: CUpti_CallbackId = 2;

// ── NVTX callback ids ────────────────────────────────────────────────────────

pub const CUPTI_CBID_NVTX_INVALID: CUpti_CallbackId = 0;
pub const CUPTI_CBID_NVTX_nvtxMarkA: CUpti_CallbackId = 1;
pub const CUPTI_CBID_NVTX_nvtxRangeStartA: CUpti_CallbackId = 4;
pub const CUPTI_CBID_NVTX_nvtxRangeEnd: CUpti_CallbackId = 7;
pub const CUPTI_CBID_NVTX_nvtxRangePushA: CUpti_CallbackId = 8;
pub const CUPTI_CBID_NVTX_nvtxRangePushW: CUpti_CallbackId = 9;
pub const CUPTI_CBID_NVTX_nvtxRangePushEx: CUpti_CallbackId = 10;
pub const CUPTI_CBID_NVTX_nvtxRangePop: CUpti_CallbackId = 11;
pub const CUPTI_CBID_NVTX_nvtxDomainMarkEx: CUpti_CallbackId = 30;
pub const CUPTI_CBID_NVTX_nvtxDomainRangePushEx: CUpti_CallbackId = 33;
pub const CUPTI_CBID_NVTX_nvtxDomainRangePop: CUpti_CallbackId = 34;

// ── Event collection ─────────────────────────────────────────────────────────

pub const CUPTI_EVENT_COLLECTION_MODE_CONTINUOUS: u32 = 0;
pub const CUPTI_EVENT_READ_FLAG_NONE: u32 = 0;

// ── Callback payloads ────────────────────────────────────────────────────────

/// `CUpti_CallbackData`, passed for driver and runtime API callbacks
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUpti_CallbackData {
    pub callbackSite: CUpti_ApiCallbackSite,
    pub functionName: *const c_char,
    pub functionParams: *const c_void,
    pub functionReturnValue: *mut c_void,
    pub symbolName: *const c_char,
    pub context: CUcontext,
    pub contextUid: u32,
    pub correlationData: *mut u64,
    pub correlationId: u32,
}

/// `CUpti_ResourceData`. The resource handle is a union; only the stream
/// member is read.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUpti_ResourceData {
    pub context: CUcontext,
    pub resourceHandle: CUstream,
    pub resourceDescriptor: *mut c_void,
}

/// `CUpti_SynchronizeData`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUpti_SynchronizeData {
    pub context: CUcontext,
    pub stream: CUstream,
}

/// `CUpti_NvtxData`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUpti_NvtxData {
    pub functionName: *const c_char,
    pub functionParams: *const c_void,
    pub functionReturnValue: *const c_void,
}

/// `nvtxEventAttributes_t` (v2). Both unions are 8 bytes wide.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct nvtxEventAttributes_t {
    pub version: u16,
    pub size: u16,
    pub category: u32,
    pub colorType: i32,
    pub color: u32,
    pub payloadType: i32,
    pub reserved0: i32,
    pub payload: u64,
    pub messageType: i32,
    pub message: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct nvtxRangePushA_params {
    pub message: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct nvtxRangePushEx_params {
    pub eventAttrib: *const nvtxEventAttributes_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct nvtxDomainRangePushEx_params {
    pub domain: *mut c_void,
    pub core: nvtxRangePushEx_params,
}

// ── Linked entry points ──────────────────────────────────────────────────────

#[cfg(feature = "cuda")]
#[link(name = "cupti")]
extern "C" {
    pub fn cuptiGetResultString(result: CUptiResult, str: *mut *const c_char) -> CUptiResult;
    pub fn cuptiSubscribe(
        subscriber: *mut CUpti_SubscriberHandle,
        callback: CUpti_CallbackFunc,
        userdata: *mut c_void,
    ) -> CUptiResult;
    pub fn cuptiUnsubscribe(subscriber: CUpti_SubscriberHandle) -> CUptiResult;
    pub fn cuptiEnableDomain(
        enable: u32,
        subscriber: CUpti_SubscriberHandle,
        domain: CUpti_CallbackDomain,
    ) -> CUptiResult;
    pub fn cuptiFinalize() -> CUptiResult;

    pub fn cuptiGetDeviceId(context: CUcontext, device_id: *mut u32) -> CUptiResult;
    pub fn cuptiGetContextId(context: CUcontext, context_id: *mut u32) -> CUptiResult;
    pub fn cuptiGetStreamId(context: CUcontext, stream: CUstream, stream_id: *mut u32) -> CUptiResult;

    pub fn cuptiSetEventCollectionMode(context: CUcontext, mode: u32) -> CUptiResult;
    pub fn cuptiEventGroupCreate(
        context: CUcontext,
        event_group: *mut CUpti_EventGroup,
        flags: u32,
    ) -> CUptiResult;
    pub fn cuptiEventGroupDestroy(event_group: CUpti_EventGroup) -> CUptiResult;
    pub fn cuptiEventGroupAddEvent(event_group: CUpti_EventGroup, event: CUpti_EventID) -> CUptiResult;
    pub fn cuptiEventGroupEnable(event_group: CUpti_EventGroup) -> CUptiResult;
    pub fn cuptiEventGroupDisable(event_group: CUpti_EventGroup) -> CUptiResult;
    pub fn cuptiEventGroupReadEvent(
        event_group: CUpti_EventGroup,
        flags: u32,
        event: CUpti_EventID,
        value_buffer_size: *mut usize,
        value_buffer: *mut u64,
    ) -> CUptiResult;
}

#[cfg(feature = "cuda")]
#[link(name = "cuda")]
extern "C" {
    pub fn cuCtxGetCurrent(pctx: *mut CUcontext) -> CUresult;
}
