//! Hybrid-time tracking for read points.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hybrid logical timestamp: microseconds since epoch shifted left by the
/// logical-bit width, ORed with a logical counter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HybridTime(pub u64);

impl HybridTime {
    pub const MIN: HybridTime = HybridTime(0);
    const LOGICAL_BITS: u32 = 12;

    pub fn from_micros(micros: u64) -> Self {
        Self(micros << Self::LOGICAL_BITS)
    }

    pub fn micros(self) -> u64 {
        self.0 >> Self::LOGICAL_BITS
    }
}

/// Read-time triple a server reports for the snapshot it actually used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTime {
    pub read: HybridTime,
    pub local_limit: HybridTime,
    pub global_limit: HybridTime,
}

impl ReadTime {
    /// Collapse all three bounds onto one timestamp.
    pub fn single_time(read: HybridTime) -> Self {
        Self {
            read,
            local_limit: read,
            global_limit: read,
        }
    }
}

/// Tracks the latest hybrid time observed from servers. Successful responses
/// advance it monotonically so later reads never pick a snapshot behind a
/// commit this client has already seen.
#[derive(Debug, Default)]
pub struct ReadPoint {
    latest_observed: AtomicU64,
}

impl ReadPoint {
    pub fn new(initial: HybridTime) -> Self {
        Self {
            latest_observed: AtomicU64::new(initial.0),
        }
    }

    pub fn update_clock(&self, observed: HybridTime) {
        self.latest_observed.fetch_max(observed.0, Ordering::AcqRel);
    }

    pub fn latest_observed(&self) -> HybridTime {
        HybridTime(self.latest_observed.load(Ordering::Acquire))
    }
}
