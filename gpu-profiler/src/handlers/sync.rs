//! Synchronize domain

use crate::cupti::api::{ContextHandle, StreamHandle};
use crate::cupti::bindings::{self, CUpti_CallbackId, CUpti_SynchronizeData};
use crate::emitter::SnapshotEmitter;
use aperture_shared::AttributeKey;
use std::ffi::c_void;

pub const STREAM: &[u8] = b"stream\0";
pub const CONTEXT: &[u8] = b"context\0";

/// Decoded synchronization callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    StreamSynchronized {
        context: ContextHandle,
        stream: StreamHandle,
    },
    ContextSynchronized {
        context: ContextHandle,
    },
    Other(CUpti_CallbackId),
}

impl SyncEvent {
    /// # Safety
    /// `cbdata` must be null or point to a valid `CUpti_SynchronizeData`.
    pub unsafe fn decode(cbid: CUpti_CallbackId, cbdata: *const c_void) -> Option<Self> {
        let data = (cbdata as *const CUpti_SynchronizeData).as_ref()?;
        let context = ContextHandle::from_raw(data.context);

        Some(match cbid {
            bindings::CUPTI_CBID_SYNCHRONIZE_STREAM_SYNCHRONIZED => SyncEvent::StreamSynchronized {
                context,
                stream: StreamHandle::from_raw(data.stream),
            },
            bindings::CUPTI_CBID_SYNCHRONIZE_CONTEXT_SYNCHRONIZED => {
                SyncEvent::ContextSynchronized { context }
            }
            other => SyncEvent::Other(other),
        })
    }
}

pub fn handle(event: SyncEvent, emitter: &SnapshotEmitter<'_>, sync_attr: AttributeKey) {
    match event {
        SyncEvent::StreamSynchronized { context, stream } => {
            emitter.stream_event(context, stream, sync_attr, STREAM);
        }
        SyncEvent::ContextSynchronized { context } => {
            emitter.context_event(context, sync_attr, CONTEXT);
        }
        SyncEvent::Other(_) => {}
    }
}
