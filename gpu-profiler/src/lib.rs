//! CUPTI callback service
//!
//! Subscribes to NVIDIA CUPTI callback domains and translates runtime/driver
//! API calls, context and stream lifecycle, synchronization and NVTX ranges
//! into Aperture host attributes and snapshots. Optionally samples a CUPTI
//! event counter per CUDA context.
//!
//! The CUPTI library is only linked with the `cuda` feature. Without it the
//! service runs against any [`CuptiApi`] implementation.

pub mod attributes;
pub mod config;
pub mod counters;
pub mod cupti;
pub mod domain;
pub mod emitter;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sampling;
pub mod service;

pub use attributes::CuptiAttributes;
pub use config::CuptiConfig;
pub use counters::{CallbackCounters, CounterSnapshot};
pub use cupti::api::{ContextHandle, CuptiApi, StreamHandle, SubscriberHandle};
pub use domain::{CallbackDomain, DomainSelection};
pub use error::{CuptiError, ServiceError};
pub use router::{cupti_callback, Callback, CallbackRouter};
pub use sampling::{EventReader, EventSampling, EventSamplingController, SamplingStatistics};
pub use service::{CuptiService, CuptiServiceBuilder};

#[cfg(feature = "cuda")]
pub use cupti::{api::SysCupti, events::SysEventReader};
