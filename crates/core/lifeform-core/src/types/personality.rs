//! Personality Profile
//!
//! Trait weights that color every decision. Weights only move through
//! bounded feedback events, and every move lands in an append-only
//! adjustment log so drift can be explained and undone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::config::PersonalityConfig;
use crate::error::{CoreError, Result};

/// Why an adjustment happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AdjustmentOrigin {
    /// External feedback (user rating or correction)
    Feedback,
    /// Compensating entry that undoes an earlier adjustment
    Revert {
        /// Sequence number of the undone adjustment
        of: u64,
    },
}

/// One entry of the adjustment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Monotonic sequence number within this profile
    pub seq: u64,
    /// When the feedback happened
    pub timestamp: DateTime<Utc>,
    /// Adjusted trait
    pub trait_name: String,
    /// Delta asked for by the caller
    pub requested: f64,
    /// Delta actually applied after range clamping
    pub applied: f64,
    /// Where the adjustment came from
    pub origin: AdjustmentOrigin,
}

/// Trait weights plus their adjustment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    traits: BTreeMap<String, f64>,
    adjustment_log: VecDeque<Adjustment>,
    weight_min: f64,
    weight_max: f64,
    max_feedback_delta: f64,
    log_capacity: usize,
    next_seq: u64,
}

impl PersonalityProfile {
    /// Build a profile from configuration
    pub fn from_config(config: &PersonalityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            traits: config.traits.clone(),
            adjustment_log: VecDeque::new(),
            weight_min: config.weight_min,
            weight_max: config.weight_max,
            max_feedback_delta: config.max_feedback_delta,
            log_capacity: config.log_capacity,
            next_seq: 0,
        })
    }

    /// All trait weights, ordered by name
    pub fn traits(&self) -> &BTreeMap<String, f64> {
        &self.traits
    }

    /// Weight of one trait
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.traits.get(name).copied()
    }

    /// Whether any trait exists
    pub fn is_initialized(&self) -> bool {
        !self.traits.is_empty()
    }

    /// Retained adjustments, oldest first
    pub fn adjustment_log(&self) -> impl Iterator<Item = &Adjustment> {
        self.adjustment_log.iter()
    }

    /// Number of retained adjustments
    pub fn log_len(&self) -> usize {
        self.adjustment_log.len()
    }

    /// Apply a feedback delta to one trait
    ///
    /// Unknown traits, non-finite deltas and deltas larger than the
    /// per-event bound are rejected without touching the profile.
    pub fn apply_feedback(
        &mut self,
        trait_name: &str,
        delta: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Adjustment> {
        if !delta.is_finite() {
            return Err(CoreError::validation(format!(
                "feedback delta for '{}' is not a finite number",
                trait_name
            )));
        }
        if delta.abs() > self.max_feedback_delta {
            return Err(CoreError::validation(format!(
                "feedback delta {:+.3} for '{}' exceeds the per-event bound {:.3}",
                delta, trait_name, self.max_feedback_delta
            )));
        }
        if !self.traits.contains_key(trait_name) {
            return Err(CoreError::validation(format!(
                "unknown personality trait '{}'",
                trait_name
            )));
        }

        Ok(self.adjust(trait_name, delta, timestamp, AdjustmentOrigin::Feedback))
    }

    /// Undo the most recent feedback adjustment that has not been undone yet
    ///
    /// Appends a compensating log entry rather than erasing history.
    pub fn revert_last(&mut self, timestamp: DateTime<Utc>) -> Option<Adjustment> {
        let reverted: Vec<u64> = self
            .adjustment_log
            .iter()
            .filter_map(|a| match a.origin {
                AdjustmentOrigin::Revert { of } => Some(of),
                AdjustmentOrigin::Feedback => None,
            })
            .collect();

        let target = self
            .adjustment_log
            .iter()
            .rev()
            .find(|a| a.origin == AdjustmentOrigin::Feedback && !reverted.contains(&a.seq))
            .cloned()?;

        Some(self.adjust(
            &target.trait_name,
            -target.applied,
            timestamp,
            AdjustmentOrigin::Revert { of: target.seq },
        ))
    }

    /// Dominant traits (weight above 0.6), strongest first
    pub fn describe(&self) -> String {
        let mut strong: Vec<(&String, f64)> = self
            .traits
            .iter()
            .filter(|(_, &w)| w > 0.6)
            .map(|(name, &w)| (name, w))
            .collect();
        strong.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        if strong.is_empty() {
            "balanced and adaptable".to_string()
        } else {
            strong
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn adjust(
        &mut self,
        trait_name: &str,
        delta: f64,
        timestamp: DateTime<Utc>,
        origin: AdjustmentOrigin,
    ) -> Adjustment {
        let current = self.traits.get(trait_name).copied().unwrap_or(0.0);
        let updated = (current + delta).clamp(self.weight_min, self.weight_max);
        self.traits.insert(trait_name.to_string(), updated);

        let adjustment = Adjustment {
            seq: self.next_seq,
            timestamp,
            trait_name: trait_name.to_string(),
            requested: delta,
            applied: updated - current,
            origin,
        };
        self.next_seq += 1;

        self.adjustment_log.push_back(adjustment.clone());
        while self.adjustment_log.len() > self.log_capacity {
            self.adjustment_log.pop_front();
        }

        adjustment
    }
}
