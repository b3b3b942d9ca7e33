//! Time sources

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Instant;

/// Source of timestamps for scheduled stimuli
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that never goes backwards
///
/// Anchored to `Utc::now()` at construction and advanced by `Instant`
/// elapsed time, so wall-clock jumps do not leak into decay ticks. Two
/// calls never return the same value.
#[derive(Debug)]
pub struct MonotonicClock {
    anchor: DateTime<Utc>,
    started: Instant,
    last: Mutex<DateTime<Utc>>,
}

impl MonotonicClock {
    /// Anchor a new clock at the current wall time
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor a new clock at `anchor`
    pub fn anchored_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
            last: Mutex::new(anchor),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let candidate = self.anchor + elapsed;

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = if candidate > *last {
            candidate
        } else {
            *last + chrono::Duration::microseconds(1)
        };
        *last = next;
        next
    }
}
