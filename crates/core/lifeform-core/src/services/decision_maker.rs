//! Decision Maker
//!
//! Scores every action kind as a weighted sum of emotion levels, trait
//! weights, memory salience, trigger bias and any learned preference, then
//! picks the best one.
//! Pure and bounded: no I/O, no hidden state, and iteration over ordered
//! maps only, so identical inputs produce bit-identical rationales.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::{ActionWeights, DecisionWeights};
use crate::error::{CoreError, Result};
use crate::types::{
    Action, ActionKind, ActionPreferences, ActionScore, EmotionKind, EmotionState, Factor,
    FactorSource, MemoryHint, PersonalityProfile, Rationale, Trigger,
};

/// Stateless action selector
#[derive(Debug, Clone)]
pub struct DecisionMaker {
    weights: DecisionWeights,
}

impl DecisionMaker {
    /// Create a decision maker over a weight table
    pub fn new(weights: DecisionWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Weight table in use
    pub fn weights(&self) -> &DecisionWeights {
        &self.weights
    }

    /// Choose one action
    ///
    /// Ties go to the kind listed first in [`ActionKind::PRIORITY_ORDER`].
    pub fn decide(
        &self,
        state: &EmotionState,
        personality: &PersonalityProfile,
        memory: Option<&MemoryHint>,
        trigger: Trigger,
    ) -> Result<Action> {
        self.select(state, personality, memory, None, trigger)
    }

    /// Choose one action, adding each kind's learned bias as a factor
    pub fn decide_with_preferences(
        &self,
        state: &EmotionState,
        personality: &PersonalityProfile,
        memory: Option<&MemoryHint>,
        preferences: &ActionPreferences,
        trigger: Trigger,
    ) -> Result<Action> {
        self.select(state, personality, memory, Some(preferences), trigger)
    }

    fn select(
        &self,
        state: &EmotionState,
        personality: &PersonalityProfile,
        memory: Option<&MemoryHint>,
        preferences: Option<&ActionPreferences>,
        trigger: Trigger,
    ) -> Result<Action> {
        if !state.is_initialized() {
            return Err(CoreError::not_ready("emotion state has no dimensions"));
        }
        if !personality.is_initialized() {
            return Err(CoreError::not_ready("personality profile has no traits"));
        }

        let empty = ActionWeights::default();
        let mut scores = Vec::with_capacity(ActionKind::PRIORITY_ORDER.len());
        let mut best: Option<(ActionKind, f64, Vec<Factor>)> = None;

        for kind in ActionKind::PRIORITY_ORDER {
            let weights = self.weights.actions.get(&kind).unwrap_or(&empty);
            let mut factors = self.factors(kind, weights, state, personality, memory, trigger);
            if let Some(learned) = preferences.map(|p| p.bias(kind)).filter(|b| *b != 0.0) {
                factors.push(factor(FactorSource::Learned, 1.0, learned));
            }
            let score: f64 = factors.iter().map(|f| f.contribution).sum();
            scores.push(ActionScore { kind, score });

            let better = match &best {
                Some((_, top, _)) => score > *top,
                None => true,
            };
            if better {
                best = Some((kind, score, factors));
            }
        }

        let (kind, score, mut factors) =
            best.ok_or_else(|| CoreError::other("no action kinds to score"))?;

        factors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        factors.truncate(self.weights.top_factors);

        let summary = format!(
            "{} ({:.3}) via {}",
            kind,
            score,
            if factors.is_empty() {
                "no contributing factors".to_string()
            } else {
                factors
                    .iter()
                    .map(|f| format!("{} {:+.3}", f.source, f.contribution))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        );

        debug!(action = %kind, trigger = ?trigger, score, "Decision made");

        Ok(Action {
            id: Uuid::new_v4(),
            kind,
            trigger,
            rationale: Rationale {
                scores,
                factors,
                summary,
            },
            decided_at: Utc::now(),
        })
    }

    fn factors(
        &self,
        kind: ActionKind,
        weights: &ActionWeights,
        state: &EmotionState,
        personality: &PersonalityProfile,
        memory: Option<&MemoryHint>,
        trigger: Trigger,
    ) -> Vec<Factor> {
        let mut factors = Vec::new();

        if weights.bias != 0.0 {
            factors.push(factor(FactorSource::Bias, 1.0, weights.bias));
        }

        for (emotion, &weight) in &weights.emotions {
            if let Some(level) = state.level(emotion) {
                factors.push(factor(FactorSource::Emotion(emotion.clone()), level, weight));
            }
        }

        for (name, &weight) in &weights.traits {
            if let Some(value) = personality.weight(name) {
                factors.push(factor(FactorSource::Trait(name.clone()), value, weight));
            }
        }

        if weights.memory != 0.0 {
            let salience = memory.map(MemoryHint::effective_salience).unwrap_or(0.0);
            factors.push(factor(FactorSource::Memory, salience, weights.memory));
        }

        if let Some(&bias) = weights.triggers.get(&trigger) {
            factors.push(factor(FactorSource::Trigger(trigger), 1.0, bias));
        }

        if kind == ActionKind::Idle && trigger == Trigger::Autonomous {
            let curiosity = state.level(&EmotionKind::Curiosity);
            if matches!(curiosity, Some(c) if c < self.weights.idle_curiosity_threshold) {
                factors.push(factor(FactorSource::LowCuriosity, 1.0, self.weights.idle_bonus));
            }
        }

        factors
    }
}

fn factor(source: FactorSource, value: f64, weight: f64) -> Factor {
    Factor {
        source,
        value,
        weight,
        contribution: value * weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonalityConfig;
    use std::collections::BTreeMap;

    fn maker() -> DecisionMaker {
        DecisionMaker::new(DecisionWeights::default()).unwrap()
    }

    fn personality() -> PersonalityProfile {
        PersonalityProfile::from_config(&PersonalityConfig::default()).unwrap()
    }

    fn state(curiosity: f64, joy: f64, excitement: f64, loneliness: f64) -> EmotionState {
        let levels: BTreeMap<EmotionKind, f64> = [
            (EmotionKind::Curiosity, curiosity),
            (EmotionKind::Joy, joy),
            (EmotionKind::Excitement, excitement),
            (EmotionKind::Loneliness, loneliness),
        ]
        .into_iter()
        .collect();
        EmotionState::new(levels, Utc::now())
    }

    #[test]
    fn test_lonely_and_reactive_speaks() {
        let action = maker()
            .decide(&state(0.3, 0.3, 0.3, 0.9), &personality(), None, Trigger::Reactive)
            .unwrap();

        assert_eq!(action.kind, ActionKind::Speak);
        let speak = action.rationale.score_of(ActionKind::Speak).unwrap();
        let think = action.rationale.score_of(ActionKind::InitiateThought).unwrap();
        assert!(speak > think);

        let top = action.rationale.top_factor().unwrap();
        assert_eq!(top.source, FactorSource::Emotion(EmotionKind::Loneliness));
        assert!((top.contribution - 0.72).abs() < 1e-12);
        assert_eq!(action.rationale.factors.len(), 3);
    }

    #[test]
    fn test_identical_inputs_give_identical_rationales() {
        let s = state(0.61, 0.42, 0.37, 0.55);
        let p = personality();
        let hint = MemoryHint::new("chatted about music", 0.4);

        let a = maker().decide(&s, &p, Some(&hint), Trigger::Autonomous).unwrap();
        let b = maker().decide(&s, &p, Some(&hint), Trigger::Autonomous).unwrap();
        assert!(a.same_decision(&b));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_autonomous_at_rest_initiates_thought() {
        let action = maker()
            .decide(&state(0.4, 0.5, 0.4, 0.3), &personality(), None, Trigger::Autonomous)
            .unwrap();
        assert_eq!(action.kind, ActionKind::InitiateThought);
    }

    #[test]
    fn test_low_curiosity_autonomous_idles() {
        let action = maker()
            .decide(&state(0.2, 0.5, 0.4, 0.3), &personality(), None, Trigger::Autonomous)
            .unwrap();
        assert_eq!(action.kind, ActionKind::Idle);
        assert!(action
            .rationale
            .factors
            .iter()
            .any(|f| f.source == FactorSource::LowCuriosity));
    }

    #[test]
    fn test_idle_bonus_only_applies_to_autonomous() {
        let action = maker()
            .decide(&state(0.2, 0.5, 0.4, 0.3), &personality(), None, Trigger::Reactive)
            .unwrap();
        assert_eq!(action.kind, ActionKind::Speak);
    }

    #[test]
    fn test_salient_memory_adjusts_behavior() {
        let hint = MemoryHint::new("user asked for quieter replies", 1.0);
        let action = maker()
            .decide(&state(0.0, 0.0, 0.0, 0.0), &personality(), Some(&hint), Trigger::Reactive)
            .unwrap();
        assert_eq!(action.kind, ActionKind::AdjustBehavior);
        assert_eq!(action.rationale.top_factor().unwrap().source, FactorSource::Memory);
    }

    #[test]
    fn test_ties_follow_priority_order() {
        let weights = DecisionWeights {
            actions: BTreeMap::new(),
            ..Default::default()
        };
        let action = DecisionMaker::new(weights)
            .unwrap()
            .decide(&state(0.5, 0.5, 0.5, 0.5), &personality(), None, Trigger::Reactive)
            .unwrap();
        assert_eq!(action.kind, ActionKind::Speak);
        let order: Vec<ActionKind> = action.rationale.scores.iter().map(|s| s.kind).collect();
        assert_eq!(order, ActionKind::PRIORITY_ORDER.to_vec());
    }

    #[test]
    fn test_learned_preference_tips_a_close_call() {
        use crate::config::LearningConfig;
        use crate::types::{Outcome, Reaction};

        let s = state(0.4, 0.5, 0.4, 0.3);
        let p = personality();
        let baseline = maker().decide(&s, &p, None, Trigger::Autonomous).unwrap();
        assert_eq!(baseline.kind, ActionKind::InitiateThought);

        let mut prefs = ActionPreferences::from_config(&LearningConfig::default()).unwrap();
        let neutral = maker()
            .decide_with_preferences(&s, &p, None, &prefs, Trigger::Autonomous)
            .unwrap();
        assert!(neutral.same_decision(&baseline));

        // speak trails initiate_thought by 0.05 here
        for _ in 0..2 {
            prefs
                .record_outcome(
                    ActionKind::Speak,
                    Outcome::new(1.0, Reaction::Positive),
                    Utc::now(),
                )
                .unwrap();
        }
        let learned = maker()
            .decide_with_preferences(&s, &p, None, &prefs, Trigger::Autonomous)
            .unwrap();
        assert_eq!(learned.kind, ActionKind::Speak);
        let top = learned.rationale.top_factor().unwrap();
        assert_eq!(top.source, FactorSource::Learned);
        assert!((top.contribution - prefs.max_bias()).abs() < 1e-12);
        assert_eq!(
            learned.rationale.score_of(ActionKind::InitiateThought),
            baseline.rationale.score_of(ActionKind::InitiateThought)
        );
    }

    #[test]
    fn test_not_ready_without_state_or_traits() {
        let empty_state = EmotionState::new(BTreeMap::new(), Utc::now());
        assert!(matches!(
            maker().decide(&empty_state, &personality(), None, Trigger::Reactive),
            Err(CoreError::NotReady(_))
        ));

        let config = PersonalityConfig {
            traits: BTreeMap::new(),
            ..Default::default()
        };
        let no_traits = PersonalityProfile::from_config(&config).unwrap();
        assert!(matches!(
            maker().decide(&state(0.5, 0.5, 0.5, 0.5), &no_traits, None, Trigger::Reactive),
            Err(CoreError::NotReady(_))
        ));
    }
}
