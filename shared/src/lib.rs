//! Shared tracing-host model for Aperture services
//!
//! This crate contains the attribute/value types, fixed-capacity snapshot
//! records and the host-facing traits that instrumentation services such as
//! the CUPTI adapter are written against.

pub mod host;
pub mod types;

// Re-export commonly used types
pub use host::{FinishHook, HostEvents, PostInitHook, SnapshotHook, SnapshotSink, TracingHost};
pub use types::{attribute::*, snapshot::*};
