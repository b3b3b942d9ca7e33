//! Actions and the rationale behind them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::EmotionKind;

/// Fixed action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Say something to the user
    Speak,
    /// Attend to the surroundings
    Observe,
    /// Start an internal line of thought
    InitiateThought,
    /// Do nothing this cycle
    Idle,
    /// Shift behavior style based on recent memory
    AdjustBehavior,
}

impl ActionKind {
    /// Tie-break order, most preferred first
    pub const PRIORITY_ORDER: [ActionKind; 5] = [
        ActionKind::Speak,
        ActionKind::InitiateThought,
        ActionKind::Observe,
        ActionKind::AdjustBehavior,
        ActionKind::Idle,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Speak => "speak",
            ActionKind::Observe => "observe",
            ActionKind::InitiateThought => "initiate_thought",
            ActionKind::Idle => "idle",
            ActionKind::AdjustBehavior => "adjust_behavior",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a decision cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Caused by conversation input
    Reactive,
    /// Caused by the autonomous-thought timer
    Autonomous,
}

/// What a scoring term was computed from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "name")]
pub enum FactorSource {
    /// Constant bias of the action kind
    Bias,
    /// An emotion level
    Emotion(EmotionKind),
    /// A personality trait weight
    Trait(String),
    /// Salience of the recent-memory hint
    Memory,
    /// Bias for the trigger that started the cycle
    Trigger(Trigger),
    /// Bonus for idling while curiosity is low
    LowCuriosity,
    /// Bias learned from earlier outcomes of the action
    Learned,
}

impl fmt::Display for FactorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorSource::Bias => f.write_str("bias"),
            FactorSource::Emotion(kind) => write!(f, "emotion:{}", kind),
            FactorSource::Trait(name) => write!(f, "trait:{}", name),
            FactorSource::Memory => f.write_str("memory"),
            FactorSource::Trigger(Trigger::Reactive) => f.write_str("trigger:reactive"),
            FactorSource::Trigger(Trigger::Autonomous) => f.write_str("trigger:autonomous"),
            FactorSource::LowCuriosity => f.write_str("low_curiosity"),
            FactorSource::Learned => f.write_str("learned"),
        }
    }
}

/// One term of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Input the term came from
    pub source: FactorSource,
    /// Input value (level, trait weight, salience, or 1.0 for constant terms)
    pub value: f64,
    /// Configured weight
    pub weight: f64,
    /// `value * weight`
    pub contribution: f64,
}

/// Score of one candidate action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionScore {
    /// Candidate kind
    pub kind: ActionKind,
    /// Total score
    pub score: f64,
}

/// Structured trace of a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    /// Every candidate's score, in tie-break order
    pub scores: Vec<ActionScore>,
    /// Strongest contributors to the chosen action, by absolute contribution
    pub factors: Vec<Factor>,
    /// One-line summary for logs
    pub summary: String,
}

impl Rationale {
    /// Strongest contributor, if any
    pub fn top_factor(&self) -> Option<&Factor> {
        self.factors.first()
    }

    /// Score of one candidate
    pub fn score_of(&self, kind: ActionKind) -> Option<f64> {
        self.scores.iter().find(|s| s.kind == kind).map(|s| s.score)
    }
}

/// A discrete behavior selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique id, for correlating dispatch logs
    pub id: Uuid,
    /// Selected behavior
    pub kind: ActionKind,
    /// Why the cycle ran
    pub trigger: Trigger,
    /// How the choice was made
    pub rationale: Rationale,
    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

impl Action {
    /// Whether two actions made the same choice for the same reasons
    ///
    /// Ignores the id and the decision time.
    pub fn same_decision(&self, other: &Action) -> bool {
        self.kind == other.kind && self.trigger == other.trigger && self.rationale == other.rationale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_source_display() {
        assert_eq!(
            FactorSource::Emotion(EmotionKind::Loneliness).to_string(),
            "emotion:loneliness"
        );
        assert_eq!(FactorSource::Trait("playfulness".into()).to_string(), "trait:playfulness");
    }

    #[test]
    fn test_same_decision_ignores_identity() {
        let rationale = Rationale {
            scores: vec![ActionScore {
                kind: ActionKind::Idle,
                score: 0.3,
            }],
            factors: Vec::new(),
            summary: "idle".into(),
        };
        let a = Action {
            id: Uuid::new_v4(),
            kind: ActionKind::Idle,
            trigger: Trigger::Autonomous,
            rationale: rationale.clone(),
            decided_at: Utc::now(),
        };
        let b = Action {
            id: Uuid::new_v4(),
            decided_at: Utc::now() + chrono::Duration::seconds(1),
            ..a.clone()
        };
        assert!(a.same_decision(&b));
        assert_eq!(b.rationale.score_of(ActionKind::Idle), Some(0.3));
    }
}
