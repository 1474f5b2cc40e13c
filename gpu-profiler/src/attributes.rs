//! Attribute keys created by the CUPTI service

use aperture_shared::{AttrProperty, AttrType, AttributeKey, TracingHost};

pub const RUNTIME_API: &str = "cupti.runtimeAPI";
pub const DRIVER_API: &str = "cupti.driverAPI";
pub const RESOURCE: &str = "cupti.resource";
pub const SYNC: &str = "cupti.sync";
pub const NVTX_RANGE: &str = "nvtx.range";
pub const CONTEXT_ID: &str = "cupti.contextID";
pub const SYMBOL_NAME: &str = "cupti.symbolName";
pub const DEVICE_ID: &str = "cupti.deviceID";
pub const STREAM_ID: &str = "cupti.streamID";

/// Handles of all attributes the callback handlers write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuptiAttributes {
    pub runtime: AttributeKey,
    pub driver: AttributeKey,
    pub resource: AttributeKey,
    pub sync: AttributeKey,
    pub nvtx_range: AttributeKey,

    pub context: AttributeKey,
    pub symbol: AttributeKey,
    pub device: AttributeKey,
    pub stream: AttributeKey,
}

impl CuptiAttributes {
    /// Create all keys in the host registry.
    ///
    /// Must run after the host's core attribute services are up, i.e. from the
    /// post-init hook.
    pub fn create(host: &dyn TracingHost) -> Self {
        use AttrProperty::{Nested, Point, SkipEvents};
        use AttrType::{String, UInt};

        Self {
            runtime: host.create_attribute(RUNTIME_API, String, Nested),
            driver: host.create_attribute(DRIVER_API, String, Nested),
            resource: host.create_attribute(RESOURCE, String, Point),
            sync: host.create_attribute(SYNC, String, Point),
            nvtx_range: host.create_attribute(NVTX_RANGE, String, Nested),

            context: host.create_attribute(CONTEXT_ID, UInt, SkipEvents),
            symbol: host.create_attribute(SYMBOL_NAME, String, SkipEvents),
            device: host.create_attribute(DEVICE_ID, UInt, SkipEvents),
            stream: host.create_attribute(STREAM_ID, UInt, SkipEvents),
        }
    }
}
