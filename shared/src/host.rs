//! Interfaces of the tracing host consumed by instrumentation services
//!
//! The host owns the attribute registry, the per-thread nested attribute
//! stacks and snapshot storage. Services only see these traits.

use crate::types::attribute::{AttrProperty, AttrType, AttributeKey, Entry, Variant};
use crate::types::snapshot::SnapshotScope;

/// Operations a service may invoke on the host.
///
/// `begin`, `end` and `set` act on the calling thread's attribute stack.
/// Values are borrowed for the duration of the call only.
pub trait TracingHost: Send + Sync {
    /// Create (or look up) an attribute in the host registry
    fn create_attribute(&self, name: &str, ty: AttrType, property: AttrProperty) -> AttributeKey;

    /// Push a value onto the attribute's stack
    fn begin(&self, attr: AttributeKey, value: Variant<'_>);

    /// Pop the innermost value of the attribute's stack
    fn end(&self, attr: AttributeKey);

    /// Replace the innermost value of the attribute's stack
    fn set(&self, attr: AttributeKey, value: Variant<'_>);

    /// Take a point-in-time snapshot carrying `trigger_info`
    fn push_snapshot(&self, scope: SnapshotScope, trigger_info: &[Entry<'_>]);
}

/// Receives entries appended to a snapshot under construction
pub trait SnapshotSink {
    fn append(&mut self, attr: AttributeKey, value: Variant<'_>);
}

/// Invoked once the host's core attribute services are ready
pub type PostInitHook = Box<dyn Fn(&dyn TracingHost) + Send + Sync>;

/// Invoked synchronously whenever the host builds a snapshot
pub type SnapshotHook =
    Box<dyn Fn(&dyn TracingHost, SnapshotScope, &[Entry<'_>], &mut dyn SnapshotSink) + Send + Sync>;

/// Invoked once when the host shuts down
pub type FinishHook = Box<dyn Fn(&dyn TracingHost) + Send + Sync>;

/// Lifecycle event subscriptions offered by the host
pub trait HostEvents {
    fn on_post_init(&mut self, hook: PostInitHook);

    fn on_snapshot(&mut self, hook: SnapshotHook);

    fn on_finish(&mut self, hook: FinishHook);
}
