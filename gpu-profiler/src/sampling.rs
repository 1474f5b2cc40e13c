//! Event sampling
//!
//! Reads a CUPTI hardware event counter whenever the host takes a snapshot on
//! a thread whose current CUDA context is monitored. Contexts move between
//! two states:
//!
//! ```text
//! Unmonitored --enable--> Monitored --disable | stop_all--> Unmonitored
//! ```
//!
//! Enabling a monitored context and disabling an unmonitored one are no-ops.
//! The resource handler drives the transitions from context create/destroy
//! callbacks, which may arrive concurrently on different threads.
//!
//! An enable first claims the context with a pending entry, then starts the
//! reader with no map lock held. Only the thread holding the claim starts a
//! context. If the entry is gone or re-claimed by the time the start returns,
//! that thread stops what it started.

use crate::cupti::api::ContextHandle;
use crate::cupti::bindings::CUpti_EventID;
use crate::error::CuptiError;
use aperture_shared::{AttrProperty, AttrType, AttributeKey, Entry, SnapshotSink, TracingHost, Variant};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Attribute carrying sampled counter values
pub const EVENT_SAMPLE_ATTR: &str = "cupti.eventSample";

/// Contract between the callback service and the sampling subsystem
pub trait EventSampling: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Create host attributes. Called from the post-init hook.
    fn post_init(&self, _host: &dyn TracingHost) {}

    fn enable_sampling_for_context(&self, context: ContextHandle);

    fn disable_sampling_for_context(&self, context: ContextHandle);

    fn is_monitored(&self, context: ContextHandle) -> bool;

    /// Append current counter values to `snapshot` if the calling thread's
    /// context is monitored
    fn snapshot(&self, host: &dyn TracingHost, trigger_info: &[Entry<'_>], snapshot: &mut dyn SnapshotSink);

    /// Release vendor resources of every monitored context
    fn stop_all(&self);

    fn print_statistics(&self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Vendor-side counter access used by [`EventSamplingController`]
pub trait EventReader: Send + Sync {
    /// Context current on the calling thread
    fn current_context(&self) -> Option<ContextHandle>;

    /// Start collecting `event` on `context`
    fn start(&self, context: ContextHandle, event: CUpti_EventID) -> Result<(), CuptiError>;

    /// Read the current value of `event` on `context`
    fn read(&self, context: ContextHandle, event: CUpti_EventID) -> Result<u64, CuptiError>;

    /// Stop collecting on `context` and release its resources
    fn stop(&self, context: ContextHandle) -> Result<(), CuptiError>;
}

/// Counters reported by [`EventSampling::print_statistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStatistics {
    pub contexts_enabled: u64,
    pub contexts_disabled: u64,
    pub samples: u64,
    pub skipped: u64,
    pub start_failures: u64,
    pub read_failures: u64,
}

impl fmt::Display for SamplingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cupti: event sampling: {} contexts enabled, {} disabled, {} samples, \
             {} snapshots outside monitored contexts, {} start failures, {} read failures",
            self.contexts_enabled,
            self.contexts_disabled,
            self.samples,
            self.skipped,
            self.start_failures,
            self.read_failures
        )
    }
}

#[derive(Debug, Default)]
struct Stats {
    contexts_enabled: AtomicU64,
    contexts_disabled: AtomicU64,
    samples: AtomicU64,
    skipped: AtomicU64,
    start_failures: AtomicU64,
    read_failures: AtomicU64,
}

impl Stats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> SamplingStatistics {
        SamplingStatistics {
            contexts_enabled: self.contexts_enabled.load(Ordering::Relaxed),
            contexts_disabled: self.contexts_disabled.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            start_failures: self.start_failures.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Per-context sampling state
#[derive(Debug)]
struct MonitoredContext {
    claim: u64,
    started: AtomicBool,
    samples: AtomicU64,
}

impl MonitoredContext {
    fn pending(claim: u64) -> Self {
        Self {
            claim,
            started: AtomicBool::new(false),
            samples: AtomicU64::new(0),
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

struct Target {
    event: CUpti_EventID,
    reader: Arc<dyn EventReader>,
}

/// [`EventSampling`] over a concurrent per-context map
pub struct EventSamplingController {
    target: Option<Target>,
    contexts: DashMap<ContextHandle, MonitoredContext>,
    next_claim: AtomicU64,
    sample_attr: OnceLock<AttributeKey>,
    stats: Stats,
}

impl EventSamplingController {
    /// Controller that samples `event` through `reader`
    pub fn new(event: CUpti_EventID, reader: Arc<dyn EventReader>) -> Self {
        Self {
            target: Some(Target { event, reader }),
            contexts: DashMap::new(),
            next_claim: AtomicU64::new(0),
            sample_attr: OnceLock::new(),
            stats: Stats::default(),
        }
    }

    /// Inert controller; every operation is a no-op
    pub fn disabled() -> Self {
        Self {
            target: None,
            contexts: DashMap::new(),
            next_claim: AtomicU64::new(0),
            sample_attr: OnceLock::new(),
            stats: Stats::default(),
        }
    }

    pub fn event_id(&self) -> Option<CUpti_EventID> {
        self.target.as_ref().map(|t| t.event)
    }

    pub fn monitored_contexts(&self) -> usize {
        self.contexts.iter().filter(|state| state.is_started()).count()
    }

    pub fn statistics(&self) -> SamplingStatistics {
        self.stats.load()
    }

    /// Samples taken on `context` since it was enabled
    pub fn samples_for(&self, context: ContextHandle) -> Option<u64> {
        self.contexts
            .get(&context)
            .filter(|state| state.is_started())
            .map(|state| state.samples.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for EventSamplingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSamplingController")
            .field("event_id", &self.event_id())
            .field("monitored_contexts", &self.monitored_contexts())
            .field("stats", &self.stats.load())
            .finish()
    }
}

impl EventSampling for EventSamplingController {
    fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    fn post_init(&self, host: &dyn TracingHost) {
        if self.is_enabled() {
            self.sample_attr.get_or_init(|| {
                host.create_attribute(EVENT_SAMPLE_ATTR, AttrType::UInt, AttrProperty::SkipEvents)
            });
        }
    }

    fn enable_sampling_for_context(&self, context: ContextHandle) {
        let Some(target) = &self.target else {
            return;
        };

        let claim = self.next_claim.fetch_add(1, Ordering::Relaxed);
        match self.contexts.entry(context) {
            dashmap::mapref::entry::Entry::Occupied(_) => return,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(MonitoredContext::pending(claim));
            }
        }

        if let Err(e) = target.reader.start(context, target.event) {
            self.contexts.remove_if(&context, |_, state| state.claim == claim);
            Stats::bump(&self.stats.start_failures);
            debug!("cupti: event sampling not started for {:?}: {}", context, e);
            return;
        }

        let kept = match self.contexts.get(&context) {
            Some(state) if state.claim == claim => {
                state.started.store(true, Ordering::Release);
                true
            }
            _ => false,
        };

        if kept {
            Stats::bump(&self.stats.contexts_enabled);
            return;
        }

        // Disabled while starting
        if let Err(e) = target.reader.stop(context) {
            debug!("cupti: stopping event sampling for {:?} failed: {}", context, e);
        }
    }

    fn disable_sampling_for_context(&self, context: ContextHandle) {
        let Some(target) = &self.target else {
            return;
        };

        // A pending entry is stopped by the thread that claimed it
        let Some((_, state)) = self.contexts.remove(&context) else {
            return;
        };
        if state.is_started() {
            Stats::bump(&self.stats.contexts_disabled);
            if let Err(e) = target.reader.stop(context) {
                debug!("cupti: stopping event sampling for {:?} failed: {}", context, e);
            }
        }
    }

    fn is_monitored(&self, context: ContextHandle) -> bool {
        self.contexts
            .get(&context)
            .map_or(false, |state| state.is_started())
    }

    fn snapshot(&self, _host: &dyn TracingHost, _trigger_info: &[Entry<'_>], snapshot: &mut dyn SnapshotSink) {
        let (Some(target), Some(attr)) = (&self.target, self.sample_attr.get()) else {
            return;
        };
        let Some(context) = target.reader.current_context() else {
            Stats::bump(&self.stats.skipped);
            return;
        };
        let Some(state) = self.contexts.get(&context).filter(|state| state.is_started()) else {
            Stats::bump(&self.stats.skipped);
            return;
        };

        match target.reader.read(context, target.event) {
            Ok(value) => {
                snapshot.append(*attr, Variant::UInt(value));
                state.samples.fetch_add(1, Ordering::Relaxed);
                Stats::bump(&self.stats.samples);
            }
            Err(_) => Stats::bump(&self.stats.read_failures),
        }
    }

    fn stop_all(&self) {
        let Some(target) = &self.target else {
            return;
        };

        self.contexts.retain(|context, state| {
            if state.is_started() {
                Stats::bump(&self.stats.contexts_disabled);
                if let Err(e) = target.reader.stop(*context) {
                    debug!("cupti: stopping event sampling for {:?} failed: {}", context, e);
                }
            }
            false
        });
    }

    fn print_statistics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.stats.load())
    }
}
