//! Emotion Engine
//!
//! The only component that mutates an [`EmotionState`]. Stimuli move levels
//! through the configured response table; ticks pull every level back toward
//! its baseline with exponential decay:
//!
//! ```text
//! level' = baseline + (level - baseline) * exp(-rate * dt)
//! ```
//!
//! Decay never overshoots the baseline and never leaves `[0, 1]`.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::EmotionConfig;
use crate::error::{CoreError, Result};
use crate::types::{EmotionKind, EmotionState, Stimulus, StimulusPayload};

/// Owner of the live emotional state
#[derive(Debug, Clone)]
pub struct EmotionEngine {
    state: EmotionState,
    config: EmotionConfig,
}

impl EmotionEngine {
    /// Build an engine with every configured dimension at its initial level
    pub fn new(config: EmotionConfig, at: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let initial = config
            .dimensions
            .iter()
            .map(|(kind, dim)| (kind.clone(), dim.initial))
            .collect();
        Ok(Self {
            state: EmotionState::new(initial, at),
            config,
        })
    }

    /// Resume from a previously persisted state
    ///
    /// Every tracked kind must have a configured dimension, otherwise it
    /// could never decay.
    pub fn from_state(config: EmotionConfig, state: EmotionState) -> Result<Self> {
        config.validate()?;
        if let Some(kind) = state
            .levels()
            .keys()
            .find(|k| !config.dimensions.contains_key(*k))
        {
            return Err(CoreError::config(format!(
                "restored state tracks '{}' which has no configured dimension",
                kind
            )));
        }
        Ok(Self { state, config })
    }

    /// Read-only copy of the current state
    pub fn snapshot(&self) -> EmotionState {
        self.state.clone()
    }

    /// Borrow the current state
    pub fn state(&self) -> &EmotionState {
        &self.state
    }

    /// Engine configuration
    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    /// Apply one stimulus
    ///
    /// Malformed stimuli are rejected and leave the state untouched.
    /// `SystemTick` stimuli decay the state to their timestamp.
    pub fn apply_stimulus(&mut self, stimulus: &Stimulus) -> Result<()> {
        stimulus.validate()?;

        if let StimulusPayload::SystemTick = stimulus.payload {
            return self.tick(stimulus.timestamp);
        }

        let deltas = self.deltas_for(stimulus);
        for (kind, delta) in &deltas {
            if let Some(level) = self.state.level(kind) {
                self.state.set_level(kind, level + delta);
            }
        }

        debug!(
            kind = ?stimulus.kind,
            source = %stimulus.source,
            deltas = ?deltas,
            "Applied stimulus"
        );
        Ok(())
    }

    /// Decay every level toward its baseline for the time elapsed since the
    /// last tick
    ///
    /// `now` must be strictly after the last applied tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        let last = self.state.last_updated();
        if now <= last {
            return Err(CoreError::clock_ordering(last, now));
        }

        let dt = elapsed_secs(last, now);
        for (kind, level) in self.state.levels_mut() {
            let Some(dim) = self.config.dimensions.get(kind) else {
                continue;
            };
            let f = decay_factor(dim.decay_rate, dt);
            *level = (dim.baseline + (*level - dim.baseline) * f).clamp(0.0, 1.0);
        }
        self.state.advance_to(now);

        trace!(dt_secs = dt, "Decay tick applied");
        Ok(())
    }

    /// Delta per kind for a stimulus, including spill-over through the
    /// interaction matrix
    fn deltas_for(&self, stimulus: &Stimulus) -> BTreeMap<EmotionKind, f64> {
        let mut primary: BTreeMap<EmotionKind, f64> = BTreeMap::new();
        if let Some(response) = self.config.responses.get(&stimulus.kind) {
            let signal = stimulus.payload.signal();
            for (kind, base) in &response.base {
                *primary.entry(kind.clone()).or_default() += base;
            }
            for (kind, scaled) in &response.scaled {
                *primary.entry(kind.clone()).or_default() += scaled * signal;
            }
        }

        if self.config.interactions.is_empty() {
            return primary;
        }

        let mut total = primary.clone();
        for (from, delta) in &primary {
            if let Some(row) = self.config.interactions.get(from) {
                for (to, factor) in row {
                    *total.entry(to.clone()).or_default() += delta * factor;
                }
            }
        }
        total
    }
}

/// Fraction of the distance to baseline that survives `dt_secs` seconds
///
/// Strictly inside `(0, 1)` for any positive rate and positive gap, and
/// decreasing in `dt_secs`.
pub fn decay_factor(rate: f64, dt_secs: f64) -> f64 {
    (-rate * dt_secs)
        .exp()
        .clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON)
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let gap = to - from;
    match gap.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => gap.num_milliseconds() as f64 / 1_000.0,
    }
}
