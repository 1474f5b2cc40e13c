//! NVTX annotation domain
//!
//! Range push/pop markers map onto the nested `nvtx.range` attribute. The
//! stored string length includes the terminating NUL. Domain-scoped ranges
//! share the global attribute.

use super::c_str_bytes_with_nul;
use crate::cupti::bindings::{
    self, nvtxDomainRangePushEx_params, nvtxEventAttributes_t, nvtxRangePushA_params,
    nvtxRangePushEx_params, CUpti_CallbackId, CUpti_NvtxData,
};
use aperture_shared::{AttributeKey, TracingHost, Variant};
use std::ffi::{c_char, c_void};

/// Text recorded for a push without a message
const EMPTY_MESSAGE: &[u8] = b"\0";

/// Decoded NVTX callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvtxEvent<'a> {
    /// Range push; `message` includes the terminator
    Push { message: &'a [u8] },
    Pop,
    Other(CUpti_CallbackId),
}

impl<'a> NvtxEvent<'a> {
    pub fn push(message: &'a [u8]) -> Self {
        NvtxEvent::Push { message }
    }

    /// # Safety
    /// `cbdata` must be null or point to a valid `CUpti_NvtxData` whose
    /// parameter block matches `cbid`.
    pub unsafe fn decode(cbid: CUpti_CallbackId, cbdata: *const c_void) -> Option<Self> {
        let data = (cbdata as *const CUpti_NvtxData).as_ref()?;
        let params = data.functionParams;

        let event = match cbid {
            bindings::CUPTI_CBID_NVTX_nvtxRangePushA => {
                let params = (params as *const nvtxRangePushA_params).as_ref()?;
                NvtxEvent::Push {
                    message: message_bytes(params.message),
                }
            }
            bindings::CUPTI_CBID_NVTX_nvtxRangePushEx => {
                let params = (params as *const nvtxRangePushEx_params).as_ref()?;
                NvtxEvent::Push {
                    message: attrib_message(params.eventAttrib),
                }
            }
            bindings::CUPTI_CBID_NVTX_nvtxDomainRangePushEx => {
                let params = (params as *const nvtxDomainRangePushEx_params).as_ref()?;
                NvtxEvent::Push {
                    message: attrib_message(params.core.eventAttrib),
                }
            }
            bindings::CUPTI_CBID_NVTX_nvtxRangePop | bindings::CUPTI_CBID_NVTX_nvtxDomainRangePop => {
                NvtxEvent::Pop
            }
            other => NvtxEvent::Other(other),
        };

        Some(event)
    }
}

unsafe fn message_bytes<'a>(message: *const c_char) -> &'a [u8] {
    c_str_bytes_with_nul(message).unwrap_or(EMPTY_MESSAGE)
}

unsafe fn attrib_message<'a>(attrib: *const nvtxEventAttributes_t) -> &'a [u8] {
    match attrib.as_ref() {
        Some(attrib) => message_bytes(attrib.message),
        None => EMPTY_MESSAGE,
    }
}

pub fn handle(event: NvtxEvent<'_>, host: &dyn TracingHost, range_attr: AttributeKey) {
    match event {
        NvtxEvent::Push { message } => host.begin(range_attr, Variant::Str(message)),
        NvtxEvent::Pop => host.end(range_attr),
        NvtxEvent::Other(_) => {}
    }
}
