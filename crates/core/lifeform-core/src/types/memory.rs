//! Recent-memory summary handed to the decision maker

use serde::{Deserialize, Serialize};

/// Summary of recent memory, fetched from the memory collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryHint {
    /// Free-form summary, carried into logs only
    pub summary: String,
    /// How much recent memory calls for a behavior change, in `[0, 1]`
    pub salience: f64,
}

impl MemoryHint {
    /// A hint with the given salience
    pub fn new(summary: impl Into<String>, salience: f64) -> Self {
        Self {
            summary: summary.into(),
            salience,
        }
    }

    /// The fallback used when memory is unavailable or slow
    pub fn empty() -> Self {
        Self::default()
    }

    /// Salience clamped into `[0, 1]`; non-finite values count as zero
    pub fn effective_salience(&self) -> f64 {
        if self.salience.is_finite() {
            self.salience.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
