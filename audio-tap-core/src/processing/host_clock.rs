use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::models::buffer::HostTime;

/// Monotonic host clock used to stamp forwarded buffers.
///
/// Stamps are strictly increasing across calls, even when two calls land on
/// the same clock tick. Lock-free; safe to call from the render thread.
#[derive(Debug)]
pub struct HostClock {
    origin: Instant,
    last: AtomicU64,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> HostTime {
        let raw = self.origin.elapsed().as_nanos() as u64;
        let previous = match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| Some(raw.max(prev + 1)))
        {
            Ok(prev) | Err(prev) => prev,
        };
        HostTime(raw.max(previous + 1))
    }

    /// Time of the most recent stamp (zero before the first one).
    pub fn last(&self) -> HostTime {
        HostTime(self.last.load(Ordering::Acquire))
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}
