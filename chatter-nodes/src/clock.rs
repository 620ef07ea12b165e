//!
//! Node time.
//!
//! Node time reads like wall-clock time (seconds since the Unix epoch) but
//! is advanced by a monotonic clock after the node starts, so successive
//! reads never go backwards even if the system clock is adjusted.
//!

use std::time::{SystemTime, UNIX_EPOCH};

use quanta::{Clock, Instant};

/// A monotonic clock anchored to wall-clock time
#[derive(Clone)]
pub struct NodeClock {
    // The quanta high-precision clock
    clock: Clock,
    // When the clock was anchored
    anchor: Instant,
    // Wall-clock seconds at the anchor
    anchor_secs: f64,
}

impl NodeClock {
    /// Anchor a new clock to the current wall-clock time
    pub fn new() -> Self {
        let anchor_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_secs_f64())
            .unwrap_or_default();

        Self::anchored_at(anchor_secs)
    }

    /// Anchor a new clock so it reads `secs` right now
    pub fn anchored_at(secs: f64) -> Self {
        let clock = Clock::new();
        let anchor = clock.now();

        Self {
            clock,
            anchor,
            anchor_secs: secs,
        }
    }

    /// The current node time in seconds
    pub fn now_secs(&self) -> f64 {
        self.anchor_secs + self.clock.now().duration_since(self.anchor).as_secs_f64()
    }
}

impl Default for NodeClock {
    fn default() -> Self {
        Self::new()
    }
}
