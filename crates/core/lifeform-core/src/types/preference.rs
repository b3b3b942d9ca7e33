//! Action Preferences
//!
//! Learned per-action bias built from the observed outcome of earlier
//! actions. A well-received action becomes slightly more attractive, a
//! poorly received one slightly less, always within a fixed bound. Every
//! change is logged the same way personality adjustments are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::ActionKind;
use crate::config::LearningConfig;
use crate::error::{CoreError, Result};

/// How the user took an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    /// Welcomed
    Positive,
    /// No visible reaction
    #[default]
    Neutral,
    /// Unwelcome
    Negative,
}

impl Reaction {
    fn sign(self) -> f64 {
        match self {
            Reaction::Positive => 1.0,
            Reaction::Neutral => 0.0,
            Reaction::Negative => -1.0,
        }
    }
}

/// Observed result of an action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// How well the action achieved its aim, in `[0, 1]`; 0.5 is neutral
    pub success: f64,
    /// User reaction
    #[serde(default)]
    pub reaction: Reaction,
}

impl Outcome {
    /// Create an outcome
    pub fn new(success: f64, reaction: Reaction) -> Self {
        Self { success, reaction }
    }

    /// Check that `success` is a number in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if !self.success.is_finite() || !(0.0..=1.0).contains(&self.success) {
            return Err(CoreError::validation(format!(
                "outcome success must be a number in [0, 1], got {}",
                self.success
            )));
        }
        Ok(())
    }
}

/// One entry of the preference log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceAdjustment {
    /// Monotonic sequence number
    pub seq: u64,
    /// When the outcome was observed
    pub timestamp: DateTime<Utc>,
    /// Action the outcome belongs to
    pub action: ActionKind,
    /// The outcome that caused the change
    pub outcome: Outcome,
    /// Delta derived from the outcome
    pub requested: f64,
    /// Delta actually applied after clamping to the bound
    pub applied: f64,
    /// Bias after the change
    pub bias: f64,
}

/// Learned bias per action kind plus its change log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPreferences {
    biases: BTreeMap<ActionKind, f64>,
    log: VecDeque<PreferenceAdjustment>,
    reaction_step: f64,
    success_step: f64,
    max_bias: f64,
    log_capacity: usize,
    next_seq: u64,
}

impl ActionPreferences {
    /// Neutral preferences: every bias starts at zero
    pub fn from_config(config: &LearningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            biases: BTreeMap::new(),
            log: VecDeque::new(),
            reaction_step: config.reaction_step,
            success_step: config.success_step,
            max_bias: config.max_bias,
            log_capacity: config.log_capacity,
            next_seq: 0,
        })
    }

    /// Learned bias of one action kind
    pub fn bias(&self, kind: ActionKind) -> f64 {
        self.biases.get(&kind).copied().unwrap_or(0.0)
    }

    /// Every non-neutral bias
    pub fn biases(&self) -> &BTreeMap<ActionKind, f64> {
        &self.biases
    }

    /// Largest |bias| any action can reach
    pub fn max_bias(&self) -> f64 {
        self.max_bias
    }

    /// Retained adjustments, oldest first
    pub fn log(&self) -> impl Iterator<Item = &PreferenceAdjustment> {
        self.log.iter()
    }

    /// Number of retained adjustments
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Learn from one outcome
    ///
    /// The reaction moves the bias by `reaction_step` and success moves it
    /// by `(success - 0.5) * success_step`. The result is clamped to
    /// `[-max_bias, max_bias]`. Invalid outcomes leave everything untouched.
    pub fn record_outcome(
        &mut self,
        action: ActionKind,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> Result<PreferenceAdjustment> {
        outcome.validate()?;

        let requested = outcome.reaction.sign() * self.reaction_step
            + (outcome.success - 0.5) * self.success_step;
        let current = self.bias(action);
        let updated = (current + requested).clamp(-self.max_bias, self.max_bias);
        self.biases.insert(action, updated);

        let adjustment = PreferenceAdjustment {
            seq: self.next_seq,
            timestamp,
            action,
            outcome,
            requested,
            applied: updated - current,
            bias: updated,
        };
        self.next_seq += 1;

        self.log.push_back(adjustment.clone());
        while self.log.len() > self.log_capacity {
            self.log.pop_front();
        }
        Ok(adjustment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preferences() -> ActionPreferences {
        ActionPreferences::from_config(&LearningConfig::default()).unwrap()
    }

    #[test]
    fn test_positive_outcome_raises_bias() {
        let mut prefs = preferences();
        let adj = prefs
            .record_outcome(ActionKind::Speak, Outcome::new(1.0, Reaction::Positive), Utc::now())
            .unwrap();
        assert!((adj.requested - 0.15).abs() < 1e-12);
        assert!((prefs.bias(ActionKind::Speak) - 0.15).abs() < 1e-12);
        assert_eq!(prefs.bias(ActionKind::Observe), 0.0);
        assert_eq!(prefs.log_len(), 1);
    }

    #[test]
    fn test_bias_is_bounded() {
        let mut prefs = preferences();
        for _ in 0..20 {
            prefs
                .record_outcome(ActionKind::Idle, Outcome::new(0.0, Reaction::Negative), Utc::now())
                .unwrap();
        }
        assert_eq!(prefs.bias(ActionKind::Idle), -prefs.max_bias());
        let last = prefs.log().last().unwrap();
        assert_eq!(last.applied, 0.0);
        assert!(last.requested < 0.0);
    }

    #[test]
    fn test_neutral_outcome_changes_nothing() {
        let mut prefs = preferences();
        let adj = prefs
            .record_outcome(ActionKind::Observe, Outcome::new(0.5, Reaction::Neutral), Utc::now())
            .unwrap();
        assert_eq!(adj.applied, 0.0);
        assert_eq!(prefs.bias(ActionKind::Observe), 0.0);
    }

    #[test]
    fn test_invalid_outcome_is_rejected() {
        let mut prefs = preferences();
        let before = prefs.clone();
        assert!(matches!(
            prefs.record_outcome(ActionKind::Speak, Outcome::new(1.5, Reaction::Positive), Utc::now()),
            Err(CoreError::Validation(_))
        ));
        assert!(prefs
            .record_outcome(ActionKind::Speak, Outcome::new(f64::NAN, Reaction::Neutral), Utc::now())
            .is_err());
        assert_eq!(prefs, before);
    }

    #[test]
    fn test_log_is_capped() {
        let config = LearningConfig {
            log_capacity: 2,
            ..Default::default()
        };
        let mut prefs = ActionPreferences::from_config(&config).unwrap();
        for _ in 0..4 {
            prefs
                .record_outcome(ActionKind::Speak, Outcome::new(0.6, Reaction::Neutral), Utc::now())
                .unwrap();
        }
        let seqs: Vec<u64> = prefs.log().map(|a| a.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }
}
