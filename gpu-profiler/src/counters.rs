//! Callback counters
//!
//! Incremented from any callback thread with relaxed atomics. Counts are exact;
//! no ordering with other memory is implied.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-category callback counts for one service instance
#[derive(Debug, Default)]
pub struct CallbackCounters {
    total: AtomicU64,
    api: AtomicU64,
    resource: AtomicU64,
    sync: AtomicU64,
    nvtx: AtomicU64,
}

/// Point-in-time copy of [`CallbackCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: u64,
    pub api: u64,
    pub resource: u64,
    pub sync: u64,
    pub nvtx: u64,
}

impl CallbackCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_callback(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_api(&self) {
        self.api.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_resource(&self) {
        self.resource.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sync(&self) {
        self.sync.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_nvtx(&self) {
        self.nvtx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total.load(Ordering::Relaxed),
            api: self.api.load(Ordering::Relaxed),
            resource: self.resource.load(Ordering::Relaxed),
            sync: self.sync.load(Ordering::Relaxed),
            nvtx: self.nvtx.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} API callbacks, {} resource callbacks, {} sync callbacks, {} nvtx callbacks ({} total)",
            self.api, self.resource, self.sync, self.nvtx, self.total
        )
    }
}
