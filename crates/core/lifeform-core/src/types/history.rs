//! Emotion History
//!
//! Bounded trail of published emotional snapshots, oldest first. The engine
//! worker appends every state it publishes; readers use it to see where a
//! dimension has been heading.

use chrono::Duration;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{EmotionKind, EmotionState};

/// Recent emotional snapshots with a fixed retention
#[derive(Debug, Clone)]
pub struct EmotionHistory {
    entries: VecDeque<Arc<EmotionState>>,
    capacity: usize,
}

impl EmotionHistory {
    /// Create an empty history; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum retained snapshots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained snapshots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a snapshot, evicting the oldest past capacity
    pub fn record(&mut self, snapshot: Arc<EmotionState>) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Retained snapshots, oldest first
    pub fn snapshots(&self) -> impl Iterator<Item = &Arc<EmotionState>> {
        self.entries.iter()
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<&Arc<EmotionState>> {
        self.entries.back()
    }

    /// Levels of `kind`, oldest first, from snapshots no older than `window`
    /// before the newest one
    ///
    /// Empty when nothing is recorded or `kind` is not tracked.
    pub fn trend(&self, kind: &EmotionKind, window: Duration) -> Vec<f64> {
        let Some(newest) = self.latest() else {
            return Vec::new();
        };
        let cutoff = newest.last_updated() - window;
        self.entries
            .iter()
            .filter(|s| s.last_updated() >= cutoff)
            .filter_map(|s| s.level(kind))
            .collect()
    }
}
