//! Emotional State Model
//!
//! A bounded vector of named affective dimensions. Levels live in `[0, 1]`,
//! the set of dimensions is fixed when the state is built, and only the
//! emotion engine holds a mutable instance. Everyone else sees snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One named axis of affective state
///
/// Ordering is the declaration order followed by custom kinds sorted by
/// name, which keeps every map keyed by kind deterministic to iterate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EmotionKind {
    /// Drive to explore and learn
    Curiosity,
    /// Pleasure and happiness
    Joy,
    /// Activation and eagerness
    Excitement,
    /// Lack of companionship
    Loneliness,
    /// Extension kind named by configuration
    Custom(String),
}

impl EmotionKind {
    /// The built-in kinds, in ordering order
    pub const BUILTIN: [EmotionKind; 4] = [
        EmotionKind::Curiosity,
        EmotionKind::Joy,
        EmotionKind::Excitement,
        EmotionKind::Loneliness,
    ];

    /// Build a kind from its name; unknown names become custom kinds
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "curiosity" => EmotionKind::Curiosity,
            "joy" => EmotionKind::Joy,
            "excitement" => EmotionKind::Excitement,
            "loneliness" => EmotionKind::Loneliness,
            other => EmotionKind::Custom(other.to_string()),
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &str {
        match self {
            EmotionKind::Curiosity => "curiosity",
            EmotionKind::Joy => "joy",
            EmotionKind::Excitement => "excitement",
            EmotionKind::Loneliness => "loneliness",
            EmotionKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for EmotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<EmotionKind> for String {
    fn from(kind: EmotionKind) -> Self {
        kind.name().to_string()
    }
}

impl From<String> for EmotionKind {
    fn from(name: String) -> Self {
        EmotionKind::from_name(&name)
    }
}

/// Complete emotional state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    levels: BTreeMap<EmotionKind, f64>,
    last_updated: DateTime<Utc>,
}

impl EmotionState {
    /// Create a state from initial levels
    ///
    /// Levels are clamped into `[0, 1]`; non-finite levels fall back to 0.5.
    pub fn new(initial: BTreeMap<EmotionKind, f64>, at: DateTime<Utc>) -> Self {
        let levels = initial
            .into_iter()
            .map(|(kind, level)| {
                let level = if level.is_finite() { level } else { 0.5 };
                (kind, level.clamp(0.0, 1.0))
            })
            .collect();
        Self {
            levels,
            last_updated: at,
        }
    }

    /// State holding the built-in kinds at mid-range
    pub fn mid_range(at: DateTime<Utc>) -> Self {
        Self::new(
            EmotionKind::BUILTIN.iter().cloned().map(|k| (k, 0.5)).collect(),
            at,
        )
    }

    /// All levels, ordered by kind
    pub fn levels(&self) -> &BTreeMap<EmotionKind, f64> {
        &self.levels
    }

    /// Level of one kind, if the state tracks it
    pub fn level(&self, kind: &EmotionKind) -> Option<f64> {
        self.levels.get(kind).copied()
    }

    /// Timestamp of the last applied tick
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Whether this state tracks `kind`
    pub fn contains(&self, kind: &EmotionKind) -> bool {
        self.levels.contains_key(kind)
    }

    /// Whether any dimension exists at all
    pub fn is_initialized(&self) -> bool {
        !self.levels.is_empty()
    }

    /// Highest level; ties go to the kind that sorts first
    pub fn dominant(&self) -> Option<(&EmotionKind, f64)> {
        let mut best: Option<(&EmotionKind, f64)> = None;
        for (kind, &level) in &self.levels {
            match best {
                Some((_, top)) if top >= level => {}
                _ => best = Some((kind, level)),
            }
        }
        best
    }

    /// Human-readable description of the current state
    pub fn describe(&self) -> String {
        let Some((kind, level)) = self.dominant() else {
            return "emotionally blank".to_string();
        };

        let intensity_word = if level >= 0.8 {
            "intensely"
        } else if level >= 0.6 {
            "quite"
        } else if level >= 0.4 {
            "somewhat"
        } else if level >= 0.2 {
            "slightly"
        } else {
            "barely"
        };

        let mut desc = format!("{} {}", intensity_word, kind);

        let secondary: Vec<&str> = self
            .levels
            .iter()
            .filter(|(k, &v)| *k != kind && v >= 0.3)
            .map(|(k, _)| k.name())
            .collect();
        if !secondary.is_empty() {
            desc.push_str(&format!(", with undertones of {}", secondary.join(", ")));
        }

        desc
    }

    /// Set one tracked level, clamped; untracked kinds are ignored
    pub(crate) fn set_level(&mut self, kind: &EmotionKind, level: f64) {
        if let Some(slot) = self.levels.get_mut(kind) {
            *slot = level.clamp(0.0, 1.0);
        }
    }

    pub(crate) fn levels_mut(&mut self) -> impl Iterator<Item = (&EmotionKind, &mut f64)> {
        self.levels.iter_mut()
    }

    pub(crate) fn advance_to(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_levels() {
        let mut initial = BTreeMap::new();
        initial.insert(EmotionKind::Joy, 1.7);
        initial.insert(EmotionKind::Loneliness, -0.2);
        initial.insert(EmotionKind::Curiosity, f64::NAN);

        let state = EmotionState::new(initial, Utc::now());
        assert_eq!(state.level(&EmotionKind::Joy), Some(1.0));
        assert_eq!(state.level(&EmotionKind::Loneliness), Some(0.0));
        assert_eq!(state.level(&EmotionKind::Curiosity), Some(0.5));
    }

    #[test]
    fn test_set_level_ignores_untracked_kinds() {
        let mut state = EmotionState::mid_range(Utc::now());
        state.set_level(&EmotionKind::Custom("awe".into()), 0.9);
        assert!(!state.contains(&EmotionKind::Custom("awe".into())));
        assert_eq!(state.levels().len(), 4);

        state.set_level(&EmotionKind::Joy, 3.0);
        assert_eq!(state.level(&EmotionKind::Joy), Some(1.0));
    }

    #[test]
    fn test_dominant_tie_goes_to_first_kind() {
        let state = EmotionState::mid_range(Utc::now());
        let (kind, level) = state.dominant().unwrap();
        assert_eq!(*kind, EmotionKind::Curiosity);
        assert_eq!(level, 0.5);
    }

    #[test]
    fn test_describe_mentions_dominant_and_undertones() {
        let mut state = EmotionState::mid_range(Utc::now());
        state.set_level(&EmotionKind::Loneliness, 0.9);
        state.set_level(&EmotionKind::Joy, 0.1);
        let desc = state.describe();
        assert!(desc.starts_with("intensely loneliness"));
        assert!(desc.contains("curiosity"));
        assert!(!desc.contains("joy"));
    }

    #[test]
    fn test_kind_names_round_trip_through_strings() {
        assert_eq!(EmotionKind::from_name("Joy"), EmotionKind::Joy);
        assert_eq!(
            EmotionKind::from_name("nostalgia"),
            EmotionKind::Custom("nostalgia".into())
        );

        let json = serde_json::to_string(&EmotionState::mid_range(Utc::now())).unwrap();
        assert!(json.contains("\"loneliness\":0.5"));
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let start = Utc::now();
        let mut state = EmotionState::mid_range(start);
        state.advance_to(start - chrono::Duration::seconds(5));
        assert_eq!(state.last_updated(), start);
    }
}
