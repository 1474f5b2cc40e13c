//! Resource domain: context and stream lifecycle
//!
//! Context lifecycle events also bound the event-sampling window. Sampling is
//! enabled before the `create_context` record is pushed and disabled after the
//! `destroy_context` record, so neither edge of the window is lost.

use crate::cupti::api::{ContextHandle, StreamHandle};
use crate::cupti::bindings::{self, CUpti_CallbackId, CUpti_ResourceData};
use crate::emitter::SnapshotEmitter;
use crate::sampling::EventSampling;
use aperture_shared::AttributeKey;
use std::ffi::c_void;

pub const CREATE_CONTEXT: &[u8] = b"create_context\0";
pub const DESTROY_CONTEXT: &[u8] = b"destroy_context\0";
pub const CREATE_STREAM: &[u8] = b"create_stream\0";
pub const DESTROY_STREAM: &[u8] = b"destroy_stream\0";

/// Decoded resource callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    ContextCreated {
        context: ContextHandle,
    },
    ContextDestroyStarting {
        context: ContextHandle,
    },
    StreamCreated {
        context: ContextHandle,
        stream: StreamHandle,
    },
    StreamDestroyStarting {
        context: ContextHandle,
        stream: StreamHandle,
    },
    /// Module loads, init completion and other resource callbacks
    Other(CUpti_CallbackId),
}

impl ResourceEvent {
    /// Decode a `CUpti_ResourceData` payload.
    ///
    /// # Safety
    /// `cbdata` must be null or point to a valid `CUpti_ResourceData`.
    pub unsafe fn decode(cbid: CUpti_CallbackId, cbdata: *const c_void) -> Option<Self> {
        let data = (cbdata as *const CUpti_ResourceData).as_ref()?;
        let context = ContextHandle::from_raw(data.context);
        let stream = StreamHandle::from_raw(data.resourceHandle);

        Some(match cbid {
            bindings::CUPTI_CBID_RESOURCE_CONTEXT_CREATED => ResourceEvent::ContextCreated { context },
            bindings::CUPTI_CBID_RESOURCE_CONTEXT_DESTROY_STARTING => {
                ResourceEvent::ContextDestroyStarting { context }
            }
            bindings::CUPTI_CBID_RESOURCE_STREAM_CREATED => {
                ResourceEvent::StreamCreated { context, stream }
            }
            bindings::CUPTI_CBID_RESOURCE_STREAM_DESTROY_STARTING => {
                ResourceEvent::StreamDestroyStarting { context, stream }
            }
            other => ResourceEvent::Other(other),
        })
    }
}

/// Apply a resource event.
///
/// Sampling transitions run whether or not `records` is present. Records
/// need the host attributes, so they start once post-init has run.
pub fn handle(
    event: ResourceEvent,
    records: Option<(&SnapshotEmitter<'_>, AttributeKey)>,
    sampling: &dyn EventSampling,
) {
    match event {
        ResourceEvent::ContextCreated { context } => {
            if sampling.is_enabled() {
                sampling.enable_sampling_for_context(context);
            }
            if let Some((emitter, attr)) = records {
                emitter.context_event(context, attr, CREATE_CONTEXT);
            }
        }
        ResourceEvent::ContextDestroyStarting { context } => {
            if let Some((emitter, attr)) = records {
                emitter.context_event(context, attr, DESTROY_CONTEXT);
            }
            if sampling.is_enabled() {
                sampling.disable_sampling_for_context(context);
            }
        }
        ResourceEvent::StreamCreated { context, stream } => {
            if let Some((emitter, attr)) = records {
                emitter.stream_event(context, stream, attr, CREATE_STREAM);
            }
        }
        ResourceEvent::StreamDestroyStarting { context, stream } => {
            if let Some((emitter, attr)) = records {
                emitter.stream_event(context, stream, attr, DESTROY_STREAM);
            }
        }
        ResourceEvent::Other(_) => {}
    }
}
