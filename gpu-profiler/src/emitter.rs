//! Snapshot emitter
//!
//! Resolves device/context/stream ids and pushes a fixed-size record as a
//! point-in-time snapshot. Id resolution failures drop the record without a
//! trace: this runs on every resource and sync callback.

use crate::cupti::api::{ContextHandle, CuptiApi, StreamHandle};
use aperture_shared::{AttributeKey, FixedSnapshot, SnapshotScope, TracingHost, Variant};

/// Attribute handles of the id columns
#[derive(Debug, Clone, Copy)]
pub struct IdAttributes {
    pub device: AttributeKey,
    pub context: AttributeKey,
    pub stream: AttributeKey,
}

/// Builds and pushes lifecycle/synchronization records
pub struct SnapshotEmitter<'a> {
    pub host: &'a dyn TracingHost,
    pub api: &'a dyn CuptiApi,
    pub ids: IdAttributes,
}

impl SnapshotEmitter<'_> {
    /// Push `{device, context, tag}`. Returns whether a record was pushed.
    pub fn context_event(&self, context: ContextHandle, tag_attr: AttributeKey, tag: &[u8]) -> bool {
        let Ok(device_id) = self.api.device_id(context) else {
            return false;
        };
        let Ok(context_id) = self.api.context_id(context) else {
            return false;
        };

        let record: FixedSnapshot<'_, 3> = FixedSnapshot::from_pairs(
            [self.ids.device, self.ids.context, tag_attr],
            [
                Variant::UInt(u64::from(device_id)),
                Variant::UInt(u64::from(context_id)),
                Variant::Str(tag),
            ],
        );

        self.host
            .push_snapshot(SnapshotScope::PROCESS_THREAD, record.as_slice());
        true
    }

    /// Push `{device, context, stream, tag}`. Returns whether a record was pushed.
    pub fn stream_event(
        &self,
        context: ContextHandle,
        stream: StreamHandle,
        tag_attr: AttributeKey,
        tag: &[u8],
    ) -> bool {
        let Ok(device_id) = self.api.device_id(context) else {
            return false;
        };
        let Ok(context_id) = self.api.context_id(context) else {
            return false;
        };
        let Ok(stream_id) = self.api.stream_id(context, stream) else {
            return false;
        };

        let record: FixedSnapshot<'_, 4> = FixedSnapshot::from_pairs(
            [self.ids.device, self.ids.context, self.ids.stream, tag_attr],
            [
                Variant::UInt(u64::from(device_id)),
                Variant::UInt(u64::from(context_id)),
                Variant::UInt(u64::from(stream_id)),
                Variant::Str(tag),
            ],
        );

        self.host
            .push_snapshot(SnapshotScope::PROCESS_THREAD, record.as_slice());
        true
    }
}
