//! Callback router
//!
//! [`cupti_callback`] is the only function CUPTI calls. It runs on arbitrary
//! application threads, concurrently and reentrantly, so nothing below it may
//! block or allocate. Every invocation with a live router is counted, then the
//! raw `(domain, cbid, cbdata)` triple is decoded into a [`Callback`] and handed
//! to exactly one domain handler. A null `cbdata` is counted and dropped.

use crate::attributes::CuptiAttributes;
use crate::counters::CallbackCounters;
use crate::cupti::api::CuptiApi;
use crate::cupti::bindings::{self, CUpti_CallbackDomain, CUpti_CallbackId};
use crate::emitter::{IdAttributes, SnapshotEmitter};
use crate::handlers::api::{self as api_handler, ApiCall, ApiScope};
use crate::handlers::nvtx::{self, NvtxEvent};
use crate::handlers::resource::{self, ResourceEvent};
use crate::handlers::sync::{self, SyncEvent};
use crate::sampling::EventSampling;
use aperture_shared::{AttributeKey, TracingHost};
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A decoded vendor callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback<'a> {
    Resource(ResourceEvent),
    Synchronize(SyncEvent),
    RuntimeApi(ApiCall<'a>),
    DriverApi(ApiCall<'a>),
    Nvtx(NvtxEvent<'a>),
    /// Domain this service does not handle
    Unknown(CUpti_CallbackDomain),
}

impl<'a> Callback<'a> {
    /// Decode a raw callback. Returns `None` when `cbdata` is null.
    ///
    /// # Safety
    /// `cbdata` must be null or point to the payload CUPTI documents for
    /// `domain`, valid for `'a`.
    pub unsafe fn decode(
        domain: CUpti_CallbackDomain,
        cbid: CUpti_CallbackId,
        cbdata: *const c_void,
    ) -> Option<Self> {
        let callback = match domain {
            bindings::CUPTI_CB_DOMAIN_RESOURCE => {
                Callback::Resource(ResourceEvent::decode(cbid, cbdata)?)
            }
            bindings::CUPTI_CB_DOMAIN_SYNCHRONIZE => {
                Callback::Synchronize(SyncEvent::decode(cbid, cbdata)?)
            }
            bindings::CUPTI_CB_DOMAIN_RUNTIME_API => {
                Callback::RuntimeApi(ApiCall::decode(cbid, cbdata)?)
            }
            bindings::CUPTI_CB_DOMAIN_DRIVER_API => {
                Callback::DriverApi(ApiCall::decode(cbid, cbdata)?)
            }
            bindings::CUPTI_CB_DOMAIN_NVTX => Callback::Nvtx(NvtxEvent::decode(cbid, cbdata)?),
            other => Callback::Unknown(other),
        };

        Some(callback)
    }
}

/// Shared state reachable from the vendor callback
pub struct CallbackRouter {
    host: Arc<dyn TracingHost>,
    api: Arc<dyn CuptiApi>,
    sampling: Arc<dyn EventSampling>,
    attributes: OnceLock<CuptiAttributes>,
    counters: CallbackCounters,
    record_symbol: bool,
}

impl CallbackRouter {
    pub fn new(
        host: Arc<dyn TracingHost>,
        api: Arc<dyn CuptiApi>,
        sampling: Arc<dyn EventSampling>,
        record_symbol: bool,
    ) -> Self {
        Self {
            host,
            api,
            sampling,
            attributes: OnceLock::new(),
            counters: CallbackCounters::new(),
            record_symbol,
        }
    }

    /// Create the attribute keys. Later calls return the keys from the first.
    pub fn create_attributes(&self, host: &dyn TracingHost) -> CuptiAttributes {
        *self.attributes.get_or_init(|| CuptiAttributes::create(host))
    }

    pub fn attributes(&self) -> Option<&CuptiAttributes> {
        self.attributes.get()
    }

    pub fn counters(&self) -> &CallbackCounters {
        &self.counters
    }

    pub fn sampling(&self) -> &dyn EventSampling {
        self.sampling.as_ref()
    }

    /// Route one decoded callback to its handler. The total is counted by
    /// [`cupti_callback`] before decoding.
    pub fn dispatch(&self, callback: Callback<'_>) {
        match callback {
            Callback::RuntimeApi(_) | Callback::DriverApi(_) => self.counters.record_api(),
            Callback::Resource(_) => self.counters.record_resource(),
            Callback::Synchronize(_) => self.counters.record_sync(),
            Callback::Nvtx(_) => self.counters.record_nvtx(),
            Callback::Unknown(domain) => {
                debug!("cupti: unknown callback domain {}", domain);
                return;
            }
        }

        let attrs = self.attributes.get();

        // Sampling follows context lifecycle before post-init too
        if let Callback::Resource(event) = callback {
            let emitter = attrs.map(|a| (self.emitter(a), a.resource));
            let records = emitter.as_ref().map(|(e, attr)| (e, *attr));
            resource::handle(event, records, self.sampling());
            return;
        }

        // Not initialized yet
        let Some(attrs) = attrs else {
            return;
        };
        let host = self.host.as_ref();

        match callback {
            Callback::Synchronize(event) => sync::handle(event, &self.emitter(attrs), attrs.sync),
            Callback::RuntimeApi(call) => {
                api_handler::handle(call, host, self.api_scope(attrs.runtime, attrs))
            }
            Callback::DriverApi(call) => {
                api_handler::handle(call, host, self.api_scope(attrs.driver, attrs))
            }
            Callback::Nvtx(event) => nvtx::handle(event, host, attrs.nvtx_range),
            Callback::Resource(_) | Callback::Unknown(_) => {}
        }
    }

    fn emitter<'a>(&'a self, attrs: &CuptiAttributes) -> SnapshotEmitter<'a> {
        SnapshotEmitter {
            host: self.host.as_ref(),
            api: self.api.as_ref(),
            ids: IdAttributes {
                device: attrs.device,
                context: attrs.context,
                stream: attrs.stream,
            },
        }
    }

    fn api_scope(&self, function_attr: AttributeKey, attrs: &CuptiAttributes) -> ApiScope {
        ApiScope {
            function_attr,
            symbol_attr: attrs.symbol,
            record_symbol: self.record_symbol,
        }
    }
}

/// Entry point registered with `cuptiSubscribe`.
///
/// # Safety
/// `userdata` must be null or the address of a live [`CallbackRouter`], and
/// `cbdata` must match `domain` as documented by CUPTI.
pub unsafe extern "C" fn cupti_callback(
    userdata: *mut c_void,
    domain: CUpti_CallbackDomain,
    cbid: CUpti_CallbackId,
    cbdata: *const c_void,
) {
    let Some(router) = (userdata as *const CallbackRouter).as_ref() else {
        return;
    };
    router.counters.record_callback();

    // A panic must not unwind into the CUPTI frame
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(callback) = Callback::decode(domain, cbid, cbdata) {
            router.dispatch(callback);
        }
    }));
}
