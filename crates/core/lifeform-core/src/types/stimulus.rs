//! Stimuli: timestamped input events consumed by the emotion engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Kind of stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    /// Something the user said
    UserMessage,
    /// Something perception noticed
    PerceivedEvent,
    /// A memory surfaced
    MemoryRecall,
    /// Clock tick driving decay
    SystemTick,
}

/// Queue priority tier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background signals
    Low,
    /// Default tier
    #[default]
    Normal,
    /// Jumps ahead of normal traffic
    High,
}

/// Kind-specific stimulus data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StimulusPayload {
    /// Conversation input
    UserMessage {
        /// Sentiment score in `[-1, 1]`
        sentiment: f64,
        /// Raw text, kept for logging only
        #[serde(default)]
        text: Option<String>,
    },
    /// Perception input
    PerceivedEvent {
        /// Novelty score in `[0, 1]`
        novelty: f64,
        /// What was perceived
        #[serde(default)]
        label: Option<String>,
    },
    /// Memory input
    MemoryRecall {
        /// Emotional valence of the memory in `[-1, 1]`
        valence: f64,
        /// Recall strength in `[0, 1]`
        strength: f64,
    },
    /// Decay tick; the stimulus timestamp is the tick time
    SystemTick,
}

impl StimulusPayload {
    /// The kind this payload belongs to
    pub fn kind(&self) -> StimulusKind {
        match self {
            StimulusPayload::UserMessage { .. } => StimulusKind::UserMessage,
            StimulusPayload::PerceivedEvent { .. } => StimulusKind::PerceivedEvent,
            StimulusPayload::MemoryRecall { .. } => StimulusKind::MemoryRecall,
            StimulusPayload::SystemTick => StimulusKind::SystemTick,
        }
    }

    /// Scalar that scales the configured response for this kind
    ///
    /// sentiment for messages, novelty for perception, valence times
    /// strength for memories, zero for ticks.
    pub fn signal(&self) -> f64 {
        match self {
            StimulusPayload::UserMessage { sentiment, .. } => *sentiment,
            StimulusPayload::PerceivedEvent { novelty, .. } => *novelty,
            StimulusPayload::MemoryRecall { valence, strength } => valence * strength,
            StimulusPayload::SystemTick => 0.0,
        }
    }
}

/// A discrete timestamped input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    /// Kind of stimulus
    pub kind: StimulusKind,
    /// Kind-specific data
    pub payload: StimulusPayload,
    /// When the stimulus happened
    pub timestamp: DateTime<Utc>,
    /// Queue tier
    #[serde(default)]
    pub priority: Priority,
    /// Producing collaborator, for logs
    #[serde(default)]
    pub source: String,
}

impl Stimulus {
    /// Create a stimulus whose kind follows its payload
    pub fn new(payload: StimulusPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: payload.kind(),
            payload,
            timestamp,
            priority: Priority::Normal,
            source: String::new(),
        }
    }

    /// A user message with the given sentiment
    pub fn user_message(sentiment: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            StimulusPayload::UserMessage {
                sentiment,
                text: None,
            },
            timestamp,
        )
        .with_priority(Priority::High)
        .with_source("conversation")
    }

    /// A perceived event with the given novelty
    pub fn perceived(novelty: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            StimulusPayload::PerceivedEvent {
                novelty,
                label: None,
            },
            timestamp,
        )
        .with_source("perception")
    }

    /// A recalled memory
    pub fn recall(valence: f64, strength: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(StimulusPayload::MemoryRecall { valence, strength }, timestamp)
            .with_priority(Priority::Low)
            .with_source("memory")
    }

    /// A decay tick at `now`
    pub fn tick(now: DateTime<Utc>) -> Self {
        Self::new(StimulusPayload::SystemTick, now).with_source("scheduler")
    }

    /// Set the priority tier
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the producing collaborator
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Whether this stimulus is the conversation input the reactive path answers
    pub fn is_conversation_relevant(&self) -> bool {
        self.kind == StimulusKind::UserMessage
    }

    /// Check that kind and payload agree and every number is in range
    pub fn validate(&self) -> Result<()> {
        if self.kind != self.payload.kind() {
            return Err(CoreError::validation(format!(
                "stimulus kind {:?} does not match payload kind {:?}",
                self.kind,
                self.payload.kind()
            )));
        }

        match &self.payload {
            StimulusPayload::UserMessage { sentiment, .. } => {
                check_range("sentiment", *sentiment, -1.0, 1.0)
            }
            StimulusPayload::PerceivedEvent { novelty, .. } => {
                check_range("novelty", *novelty, 0.0, 1.0)
            }
            StimulusPayload::MemoryRecall { valence, strength } => {
                check_range("valence", *valence, -1.0, 1.0)?;
                check_range("strength", *strength, 0.0, 1.0)
            }
            StimulusPayload::SystemTick => Ok(()),
        }
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(CoreError::validation(format!(
            "{} must be a number in [{}, {}], got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind_from_payload() {
        let now = Utc::now();
        assert_eq!(Stimulus::user_message(0.5, now).kind, StimulusKind::UserMessage);
        assert_eq!(Stimulus::perceived(0.5, now).kind, StimulusKind::PerceivedEvent);
        assert_eq!(Stimulus::recall(0.2, 0.5, now).kind, StimulusKind::MemoryRecall);
        assert_eq!(Stimulus::tick(now).kind, StimulusKind::SystemTick);
        assert_eq!(Stimulus::user_message(0.5, now).priority, Priority::High);
    }

    #[test]
    fn test_validate_rejects_kind_mismatch() {
        let mut s = Stimulus::perceived(0.9, Utc::now());
        s.kind = StimulusKind::UserMessage;
        assert!(matches!(s.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_and_nan() {
        let now = Utc::now();
        assert!(Stimulus::user_message(1.5, now).validate().is_err());
        assert!(Stimulus::perceived(-0.1, now).validate().is_err());
        assert!(Stimulus::recall(0.5, f64::NAN, now).validate().is_err());
        assert!(Stimulus::recall(0.5, 1.0, now).validate().is_ok());
    }

    #[test]
    fn test_signal_per_kind() {
        let now = Utc::now();
        assert_eq!(Stimulus::user_message(-0.4, now).payload.signal(), -0.4);
        assert_eq!(Stimulus::recall(0.5, 0.5, now).payload.signal(), 0.25);
        assert_eq!(Stimulus::tick(now).payload.signal(), 0.0);
    }

    #[test]
    fn test_payload_json_shape() {
        let json = r#"{"kind":"perceived_event","payload":{"type":"perceived_event","novelty":0.8},"timestamp":"2026-01-01T00:00:00Z"}"#;
        let s: Stimulus = serde_json::from_str(json).unwrap();
        assert_eq!(s.priority, Priority::Normal);
        assert!(s.validate().is_ok());
        assert!(!s.is_conversation_relevant());
    }
}
