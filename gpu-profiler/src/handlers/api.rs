//! Runtime and driver API domains
//!
//! API calls become nested attribute scopes on the calling thread. The host
//! owns the per-thread stacks; entry/exit pairs arrive in LIFO order from
//! CUPTI, and every begin here has exactly one end on the matching exit.
//!
//! Context IDs are not attached to API scopes. There is no reliable way yet to
//! carry them through to the consumer, so `record_context` is accepted but has
//! no effect.

use super::c_str_bytes;
use crate::cupti::bindings::{self, CUpti_CallbackData, CUpti_CallbackId};
use aperture_shared::{AttributeKey, TracingHost, Variant};
use std::ffi::c_void;

/// Where in the API call the callback fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSite {
    Enter,
    Exit,
    Other(u32),
}

/// Decoded runtime/driver API callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCall<'a> {
    pub cbid: CUpti_CallbackId,
    pub site: ApiSite,
    /// Function name without terminator
    pub function_name: &'a [u8],
    /// Kernel symbol name, present for launch calls
    pub symbol_name: Option<&'a [u8]>,
}

impl<'a> ApiCall<'a> {
    pub fn enter(function_name: &'a str, symbol_name: Option<&'a str>) -> Self {
        Self {
            cbid: 0,
            site: ApiSite::Enter,
            function_name: function_name.as_bytes(),
            symbol_name: symbol_name.map(str::as_bytes),
        }
    }

    pub fn exit(function_name: &'a str, symbol_name: Option<&'a str>) -> Self {
        Self {
            site: ApiSite::Exit,
            ..Self::enter(function_name, symbol_name)
        }
    }

    /// # Safety
    /// `cbdata` must be null or point to a valid `CUpti_CallbackData` whose
    /// string members outlive `'a`.
    pub unsafe fn decode(cbid: CUpti_CallbackId, cbdata: *const c_void) -> Option<Self> {
        let data = (cbdata as *const CUpti_CallbackData).as_ref()?;

        let site = match data.callbackSite {
            bindings::CUPTI_API_ENTER => ApiSite::Enter,
            bindings::CUPTI_API_EXIT => ApiSite::Exit,
            other => ApiSite::Other(other),
        };

        Some(Self {
            cbid,
            site,
            function_name: c_str_bytes(data.functionName).unwrap_or_default(),
            symbol_name: c_str_bytes(data.symbolName),
        })
    }
}

/// Attributes and switches used by the API handler
#[derive(Debug, Clone, Copy)]
pub struct ApiScope {
    /// `cupti.runtimeAPI` or `cupti.driverAPI`
    pub function_attr: AttributeKey,
    pub symbol_attr: AttributeKey,
    pub record_symbol: bool,
}

pub fn handle(call: ApiCall<'_>, host: &dyn TracingHost, scope: ApiScope) {
    let symbol = if scope.record_symbol {
        call.symbol_name
    } else {
        None
    };

    match call.site {
        ApiSite::Enter => {
            if let Some(symbol) = symbol {
                host.set(scope.symbol_attr, Variant::Str(symbol));
            }
            host.begin(scope.function_attr, Variant::Str(call.function_name));
        }
        ApiSite::Exit => {
            host.end(scope.function_attr);
            if symbol.is_some() {
                host.end(scope.symbol_attr);
            }
        }
        ApiSite::Other(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_decode_callback_data() {
        let function = CString::new("cudaLaunchKernel").unwrap();
        let symbol = CString::new("_Z6vecAddPfS_S_i").unwrap();

        let data = CUpti_CallbackData {
            callbackSite: bindings::CUPTI_API_ENTER,
            functionName: function.as_ptr(),
            functionParams: std::ptr::null(),
            functionReturnValue: std::ptr::null_mut(),
            symbolName: symbol.as_ptr(),
            context: std::ptr::null_mut(),
            contextUid: 1,
            correlationData: std::ptr::null_mut(),
            correlationId: 7,
        };

        let call = unsafe { ApiCall::decode(211, &data as *const _ as *const c_void) }.unwrap();
        assert_eq!(call.site, ApiSite::Enter);
        assert_eq!(call.function_name, b"cudaLaunchKernel");
        assert_eq!(call.symbol_name, Some(&b"_Z6vecAddPfS_S_i"[..]));

        let exit = CUpti_CallbackData {
            callbackSite: bindings::CUPTI_API_EXIT,
            symbolName: std::ptr::null(),
            ..data
        };
        let call = unsafe { ApiCall::decode(211, &exit as *const _ as *const c_void) }.unwrap();
        assert_eq!(call.site, ApiSite::Exit);
        assert_eq!(call.symbol_name, None);
    }
}
