//! Configuration management and environment variable loading
//!
//! Every tunable of the core lives here with a concrete default: decay
//! baselines and rates, stimulus responses, the decision weight table,
//! scheduler timing, queue capacity and overflow policy, and dispatch
//! timeouts. Sections can be loaded from JSON and overridden from the
//! environment (`LIFEFORM_*` variables, optionally from a `.env` file).

use crate::error::{CoreError, Result};
use crate::types::{ActionKind, EmotionKind, StimulusKind, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from a `.env` file
///
/// Safe to call more than once. A missing file is not an error.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(CoreError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(CoreError::config(format!("Failed to load .env file: {}", e))),
    }
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Get environment variable as float
pub fn get_env_float(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

/// Per-second decay rate that leaves `retention` of the distance to
/// baseline after `secs` seconds
///
/// `decay_rate_from_retention(0.7, 600.0)` gives a decay factor of 0.7
/// for a ten minute gap.
pub fn decay_rate_from_retention(retention: f64, secs: f64) -> f64 {
    -retention.ln() / secs
}

// ============================================================================
// Emotion
// ============================================================================

/// Settings for one emotion dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    /// Level at startup
    pub initial: f64,
    /// Resting level the dimension decays toward
    pub baseline: f64,
    /// Exponential decay rate per second, must be positive
    pub decay_rate: f64,
}

impl DimensionConfig {
    /// Create a dimension config
    pub fn new(initial: f64, baseline: f64, decay_rate: f64) -> Self {
        Self {
            initial,
            baseline,
            decay_rate,
        }
    }
}

/// How one stimulus kind moves emotion levels
///
/// `delta[kind] = base[kind] + scaled[kind] * signal`, where the signal is
/// the payload's scalar (sentiment, novelty, valence times strength).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusResponse {
    /// Delta applied regardless of the signal
    pub base: BTreeMap<EmotionKind, f64>,
    /// Delta per unit of signal
    pub scaled: BTreeMap<EmotionKind, f64>,
}

/// Emotion engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Tracked dimensions; this key set is fixed for the lifetime of the state
    pub dimensions: BTreeMap<EmotionKind, DimensionConfig>,
    /// Response table per stimulus kind
    pub responses: BTreeMap<StimulusKind, StimulusResponse>,
    /// Spill-over between dimensions: a delta `d` on `from` adds
    /// `d * interactions[from][to]` to `to`. Empty by default.
    pub interactions: BTreeMap<EmotionKind, BTreeMap<EmotionKind, f64>>,
    /// Published snapshots kept for trend queries
    pub history_capacity: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(
            EmotionKind::Curiosity,
            DimensionConfig::new(0.5, 0.4, decay_rate_from_retention(0.7, 600.0)),
        );
        dimensions.insert(
            EmotionKind::Joy,
            DimensionConfig::new(0.5, 0.5, decay_rate_from_retention(0.6, 600.0)),
        );
        dimensions.insert(
            EmotionKind::Excitement,
            DimensionConfig::new(0.5, 0.4, decay_rate_from_retention(0.4, 600.0)),
        );
        dimensions.insert(
            EmotionKind::Loneliness,
            DimensionConfig::new(0.5, 0.3, decay_rate_from_retention(0.85, 600.0)),
        );

        let mut responses = BTreeMap::new();
        responses.insert(
            StimulusKind::UserMessage,
            StimulusResponse {
                base: [(EmotionKind::Loneliness, -0.15)].into_iter().collect(),
                scaled: [(EmotionKind::Joy, 0.3), (EmotionKind::Excitement, 0.1)]
                    .into_iter()
                    .collect(),
            },
        );
        responses.insert(
            StimulusKind::PerceivedEvent,
            StimulusResponse {
                base: BTreeMap::new(),
                scaled: [(EmotionKind::Curiosity, 0.3), (EmotionKind::Excitement, 0.2)]
                    .into_iter()
                    .collect(),
            },
        );
        responses.insert(
            StimulusKind::MemoryRecall,
            StimulusResponse {
                base: [(EmotionKind::Curiosity, 0.05)].into_iter().collect(),
                scaled: [(EmotionKind::Joy, 0.2), (EmotionKind::Loneliness, -0.1)]
                    .into_iter()
                    .collect(),
            },
        );

        Self {
            dimensions,
            responses,
            interactions: BTreeMap::new(),
            history_capacity: 50,
        }
    }
}

impl EmotionConfig {
    /// Validate levels, baselines and rates
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(CoreError::config("at least one emotion dimension is required"));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::config("emotion.history_capacity must be at least 1"));
        }
        for (kind, dim) in &self.dimensions {
            check_unit(&format!("emotion.{}.initial", kind), dim.initial)?;
            check_unit(&format!("emotion.{}.baseline", kind), dim.baseline)?;
            if !dim.decay_rate.is_finite() || dim.decay_rate <= 0.0 {
                return Err(CoreError::config(format!(
                    "emotion.{}.decay_rate must be a positive number, got {}",
                    kind, dim.decay_rate
                )));
            }
        }
        for (stimulus, response) in &self.responses {
            for (kind, delta) in response.base.iter().chain(response.scaled.iter()) {
                if !delta.is_finite() {
                    return Err(CoreError::config(format!(
                        "response {:?} -> {} is not finite",
                        stimulus, kind
                    )));
                }
            }
        }
        for (from, row) in &self.interactions {
            for (to, factor) in row {
                if !factor.is_finite() {
                    return Err(CoreError::config(format!(
                        "interaction {} -> {} is not finite",
                        from, to
                    )));
                }
            }
        }
        Ok(())
    }

    /// Override one dimension
    pub fn with_dimension(mut self, kind: EmotionKind, dimension: DimensionConfig) -> Self {
        self.dimensions.insert(kind, dimension);
        self
    }

    /// Set one spill-over factor
    pub fn with_interaction(mut self, from: EmotionKind, to: EmotionKind, factor: f64) -> Self {
        self.interactions.entry(from).or_default().insert(to, factor);
        self
    }
}

// ============================================================================
// Personality
// ============================================================================

/// Personality configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    /// Initial trait weights
    pub traits: BTreeMap<String, f64>,
    /// Lowest allowed weight
    pub weight_min: f64,
    /// Highest allowed weight
    pub weight_max: f64,
    /// Largest |delta| accepted from one feedback event
    pub max_feedback_delta: f64,
    /// Adjustment log retention; oldest entries drop first
    pub log_capacity: usize,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        let traits = [
            ("curiosity", 0.8),
            ("playfulness", 0.9),
            ("sociability", 0.7),
            ("stubbornness", 0.6),
            ("intelligence", 0.8),
            ("empathy", 0.7),
            ("creativity", 0.8),
            ("adventurousness", 0.7),
            ("sensitivity", 0.6),
            ("independence", 0.4),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            traits,
            weight_min: -1.0,
            weight_max: 1.0,
            max_feedback_delta: 0.1,
            log_capacity: 256,
        }
    }
}

impl PersonalityConfig {
    /// Validate range, bound and initial weights
    pub fn validate(&self) -> Result<()> {
        if !(self.weight_min.is_finite() && self.weight_max.is_finite())
            || self.weight_min >= self.weight_max
        {
            return Err(CoreError::config(format!(
                "personality weight range [{}, {}] is invalid",
                self.weight_min, self.weight_max
            )));
        }
        if !self.max_feedback_delta.is_finite() || self.max_feedback_delta <= 0.0 {
            return Err(CoreError::config(
                "personality.max_feedback_delta must be positive",
            ));
        }
        if self.log_capacity == 0 {
            return Err(CoreError::config("personality.log_capacity must be at least 1"));
        }
        for (name, weight) in &self.traits {
            if !weight.is_finite() || *weight < self.weight_min || *weight > self.weight_max {
                return Err(CoreError::config(format!(
                    "trait '{}' weight {} is outside [{}, {}]",
                    name, weight, self.weight_min, self.weight_max
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Decision weights
// ============================================================================

/// Scoring terms for one action kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionWeights {
    /// Constant term
    pub bias: f64,
    /// Weight per emotion level
    pub emotions: BTreeMap<EmotionKind, f64>,
    /// Weight per personality trait
    pub traits: BTreeMap<String, f64>,
    /// Weight of the memory hint salience
    pub memory: f64,
    /// Bias per trigger
    pub triggers: BTreeMap<Trigger, f64>,
}

impl ActionWeights {
    fn emotion(mut self, kind: EmotionKind, weight: f64) -> Self {
        self.emotions.insert(kind, weight);
        self
    }

    fn trait_weight(mut self, name: &str, weight: f64) -> Self {
        self.traits.insert(name.to_string(), weight);
        self
    }

    fn trigger(mut self, trigger: Trigger, weight: f64) -> Self {
        self.triggers.insert(trigger, weight);
        self
    }
}

/// Fixed weight table used by the decision maker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionWeights {
    /// Terms per action kind; kinds missing here score zero
    pub actions: BTreeMap<ActionKind, ActionWeights>,
    /// Under the autonomous trigger, curiosity below this makes idling attractive
    pub idle_curiosity_threshold: f64,
    /// Bonus added to Idle when the threshold applies
    pub idle_bonus: f64,
    /// Number of factors kept in a rationale
    pub top_factors: usize,
}

impl Default for DecisionWeights {
    fn default() -> Self {
        let mut actions = BTreeMap::new();
        actions.insert(
            ActionKind::Speak,
            ActionWeights::default()
                .emotion(EmotionKind::Loneliness, 0.8)
                .emotion(EmotionKind::Joy, 0.3)
                .emotion(EmotionKind::Excitement, 0.2)
                .trait_weight("sociability", 0.3)
                .trait_weight("empathy", 0.1)
                .trigger(Trigger::Reactive, 0.3),
        );
        actions.insert(
            ActionKind::InitiateThought,
            ActionWeights::default()
                .emotion(EmotionKind::Curiosity, 0.6)
                .emotion(EmotionKind::Excitement, 0.2)
                .emotion(EmotionKind::Loneliness, -0.4)
                .trait_weight("playfulness", 0.3)
                .trait_weight("creativity", 0.1)
                .trigger(Trigger::Autonomous, 0.25),
        );
        actions.insert(
            ActionKind::Observe,
            ActionWeights::default()
                .emotion(EmotionKind::Curiosity, 0.5)
                .trait_weight("adventurousness", 0.2),
        );
        actions.insert(
            ActionKind::AdjustBehavior,
            ActionWeights {
                memory: 0.6,
                ..Default::default()
            }
            .trait_weight("sensitivity", 0.2)
            .trait_weight("stubbornness", -0.2),
        );
        actions.insert(
            ActionKind::Idle,
            ActionWeights {
                bias: 0.3,
                ..Default::default()
            }
            .emotion(EmotionKind::Excitement, -0.3),
        );

        Self {
            actions,
            idle_curiosity_threshold: 0.35,
            idle_bonus: 0.6,
            top_factors: 3,
        }
    }
}

impl DecisionWeights {
    /// Validate every weight
    pub fn validate(&self) -> Result<()> {
        for (kind, w) in &self.actions {
            let all = std::iter::once(w.bias)
                .chain(std::iter::once(w.memory))
                .chain(w.emotions.values().copied())
                .chain(w.traits.values().copied())
                .chain(w.triggers.values().copied());
            for value in all {
                if !value.is_finite() {
                    return Err(CoreError::config(format!(
                        "decision weight for {} is not finite",
                        kind
                    )));
                }
            }
        }
        check_unit("decision.idle_curiosity_threshold", self.idle_curiosity_threshold)?;
        if !self.idle_bonus.is_finite() {
            return Err(CoreError::config("decision.idle_bonus is not finite"));
        }
        if self.top_factors == 0 {
            return Err(CoreError::config("decision.top_factors must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome-driven action preference learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Bias change for a positive or negative reaction
    pub reaction_step: f64,
    /// Bias change per unit of success above or below 0.5
    pub success_step: f64,
    /// Largest |bias| any action can learn
    pub max_bias: f64,
    /// Preference log retention; oldest entries drop first
    pub log_capacity: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            reaction_step: 0.1,
            success_step: 0.1,
            max_bias: 0.3,
            log_capacity: 256,
        }
    }
}

impl LearningConfig {
    /// Validate steps and bound
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("learning.reaction_step", self.reaction_step),
            ("learning.success_step", self.success_step),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::config(format!(
                    "{} must be a non-negative number, got {}",
                    field, value
                )));
            }
        }
        if !self.max_bias.is_finite() || self.max_bias <= 0.0 {
            return Err(CoreError::config("learning.max_bias must be positive"));
        }
        if self.log_capacity == 0 {
            return Err(CoreError::config("learning.log_capacity must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Scheduler, queue, dispatch
// ============================================================================

/// Timer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Decay tick period in milliseconds
    pub decay_tick_ms: u64,
    /// Lower bound of the autonomous-thought interval in milliseconds
    pub thought_interval_min_ms: u64,
    /// Upper bound of the autonomous-thought interval in milliseconds
    pub thought_interval_max_ms: u64,
    /// Seed for the interval generator; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            decay_tick_ms: 5_000,
            thought_interval_min_ms: 120_000,
            thought_interval_max_ms: 600_000,
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Decay tick period
    pub fn decay_tick(&self) -> Duration {
        Duration::from_millis(self.decay_tick_ms)
    }

    /// Autonomous-thought interval bounds
    pub fn thought_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.thought_interval_min_ms),
            Duration::from_millis(self.thought_interval_max_ms),
        )
    }

    /// Validate periods
    pub fn validate(&self) -> Result<()> {
        if self.decay_tick_ms == 0 {
            return Err(CoreError::config("scheduler.decay_tick_ms must be positive"));
        }
        if self.thought_interval_min_ms == 0
            || self.thought_interval_min_ms > self.thought_interval_max_ms
        {
            return Err(CoreError::config(format!(
                "scheduler thought interval [{}, {}] ms is invalid",
                self.thought_interval_min_ms, self.thought_interval_max_ms
            )));
        }
        if self.decay_tick_ms >= self.thought_interval_min_ms {
            return Err(CoreError::config(
                "scheduler.decay_tick_ms must be shorter than the autonomous-thought interval",
            ));
        }
        Ok(())
    }
}

/// What to do when a full queue receives another stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the incoming stimulus
    RejectNewest,
    /// Evict the oldest entry of the lowest non-empty priority tier
    #[default]
    DropOldest,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "reject_newest" | "reject" => Ok(OverflowPolicy::RejectNewest),
            "drop_oldest" | "drop" => Ok(OverflowPolicy::DropOldest),
            other => Err(CoreError::config(format!("unknown overflow policy '{}'", other))),
        }
    }
}

/// Stimulus queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued stimuli
    pub capacity: usize,
    /// Overflow resolution
    pub overflow_policy: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

impl QueueConfig {
    /// Validate capacity
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CoreError::config("queue.capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Outbound dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Time an action handler gets before it is abandoned
    pub dispatch_timeout_ms: u64,
    /// Time the memory collaborator gets before an empty hint is used
    pub memory_timeout_ms: u64,
    /// Snapshots buffered per state observer before new ones are dropped
    pub observer_buffer: usize,
    /// Decisions kept for inspection
    pub decision_log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: 2_000,
            memory_timeout_ms: 200,
            observer_buffer: 1,
            decision_log_capacity: 100,
        }
    }
}

impl DispatchConfig {
    /// Action handler timeout
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Memory fetch timeout
    pub fn memory_timeout(&self) -> Duration {
        Duration::from_millis(self.memory_timeout_ms)
    }

    /// Validate buffers and timeouts
    pub fn validate(&self) -> Result<()> {
        if self.dispatch_timeout_ms == 0 || self.memory_timeout_ms == 0 {
            return Err(CoreError::config("dispatch timeouts must be positive"));
        }
        if self.observer_buffer == 0 {
            return Err(CoreError::config("dispatch.observer_buffer must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Whole brain
// ============================================================================

/// Complete configuration of an `AIBrain`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Emotion engine
    pub emotion: EmotionConfig,
    /// Personality profile
    pub personality: PersonalityConfig,
    /// Decision weight table
    pub decision: DecisionWeights,
    /// Action preference learning
    pub learning: LearningConfig,
    /// Timers
    pub scheduler: SchedulerConfig,
    /// Stimulus queue
    pub queue: QueueConfig,
    /// Outbound dispatch
    pub dispatch: DispatchConfig,
}

impl BrainConfig {
    /// Defaults overridden from the environment
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; missing sections keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::info!("Loaded brain configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `LIFEFORM_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let s = &mut self.scheduler;
        s.decay_tick_ms = get_env_int("LIFEFORM_DECAY_TICK_MS", s.decay_tick_ms);
        if let Some(ms) = env_secs_as_ms("LIFEFORM_THOUGHT_MIN_SECS")? {
            s.thought_interval_min_ms = ms;
        }
        if let Some(ms) = env_secs_as_ms("LIFEFORM_THOUGHT_MAX_SECS")? {
            s.thought_interval_max_ms = ms;
        }
        if let Ok(seed) = env::var("LIFEFORM_THOUGHT_SEED") {
            s.seed = Some(seed.parse().map_err(|_| {
                CoreError::config(format!("LIFEFORM_THOUGHT_SEED '{}' is not a u64", seed))
            })?);
        }

        self.queue.capacity = get_env_int("LIFEFORM_QUEUE_CAPACITY", self.queue.capacity);
        if let Ok(policy) = env::var("LIFEFORM_OVERFLOW_POLICY") {
            self.queue.overflow_policy = policy.parse()?;
        }

        self.personality.max_feedback_delta =
            get_env_float("LIFEFORM_FEEDBACK_BOUND", self.personality.max_feedback_delta);
        self.dispatch.dispatch_timeout_ms =
            get_env_int("LIFEFORM_DISPATCH_TIMEOUT_MS", self.dispatch.dispatch_timeout_ms);

        Ok(self)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.emotion.validate()?;
        self.personality.validate()?;
        self.decision.validate()?;
        self.learning.validate()?;
        self.scheduler.validate()?;
        self.queue.validate()?;
        self.dispatch.validate()
    }
}

/// Whole seconds from `key` in milliseconds, `None` when unset
fn env_secs_as_ms(key: &str) -> Result<Option<u64>> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| {
        CoreError::config(format!("{} '{}' is not a whole number of seconds", key, raw))
    })?;
    secs.checked_mul(1000)
        .map(Some)
        .ok_or_else(|| CoreError::config(format!("{} '{}' is too large", key, raw)))
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(CoreError::config(format!(
            "{} must be in [0, 1], got {}",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(BrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_decay_rate_from_retention() {
        let rate = decay_rate_from_retention(0.7, 600.0);
        assert!(((-rate * 600.0).exp() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_decay_rate() {
        let config = EmotionConfig::default()
            .with_dimension(EmotionKind::Joy, DimensionConfig::new(0.5, 0.5, 0.0));
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_rejects_unbounded_learning() {
        let config = LearningConfig {
            max_bias: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let config = EmotionConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_thought_bounds() {
        let config = SchedulerConfig {
            thought_interval_min_ms: 10_000,
            thought_interval_max_ms: 5_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overflow_policy_parsing() {
        assert_eq!(
            "reject-newest".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::RejectNewest
        );
        assert_eq!("DROP_OLDEST".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::DropOldest);
        assert!("shuffle".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_json_sections_fall_back_to_defaults() {
        let json = r#"{"queue":{"capacity":4,"overflow_policy":"reject_newest"}}"#;
        let config: BrainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.queue.capacity, 4);
        assert_eq!(config.queue.overflow_policy, OverflowPolicy::RejectNewest);
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("LIFEFORM_QUEUE_CAPACITY", "64");
        env::set_var("LIFEFORM_OVERFLOW_POLICY", "reject_newest");
        env::set_var("LIFEFORM_THOUGHT_SEED", "7");

        let config = BrainConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.queue.capacity, 64);
        assert_eq!(config.queue.overflow_policy, OverflowPolicy::RejectNewest);
        assert_eq!(config.scheduler.seed, Some(7));

        env::remove_var("LIFEFORM_QUEUE_CAPACITY");
        env::remove_var("LIFEFORM_OVERFLOW_POLICY");
        env::remove_var("LIFEFORM_THOUGHT_SEED");

        // thought bounds share this test so no other test sees them set;
        // unset variables keep sub-second precision
        env::remove_var("LIFEFORM_THOUGHT_MIN_SECS");
        env::remove_var("LIFEFORM_THOUGHT_MAX_SECS");
        let mut config = BrainConfig::default();
        config.scheduler.thought_interval_min_ms = 1_500;
        config.scheduler.thought_interval_max_ms = 2_500;
        let config = config.with_env_overrides().unwrap();
        assert_eq!(config.scheduler.thought_interval_min_ms, 1_500);
        assert_eq!(config.scheduler.thought_interval_max_ms, 2_500);

        env::set_var("LIFEFORM_THOUGHT_MIN_SECS", "90");
        env::set_var("LIFEFORM_THOUGHT_MAX_SECS", "180");
        let config = BrainConfig::default().with_env_overrides().unwrap();
        assert_eq!(config.scheduler.thought_interval_min_ms, 90_000);
        assert_eq!(config.scheduler.thought_interval_max_ms, 180_000);

        env::set_var("LIFEFORM_THOUGHT_MAX_SECS", u64::MAX.to_string());
        assert!(matches!(
            BrainConfig::default().with_env_overrides(),
            Err(CoreError::Config(_))
        ));

        env::set_var("LIFEFORM_THOUGHT_MAX_SECS", "ten");
        assert!(matches!(
            BrainConfig::default().with_env_overrides(),
            Err(CoreError::Config(_))
        ));

        env::remove_var("LIFEFORM_THOUGHT_MIN_SECS");
        env::remove_var("LIFEFORM_THOUGHT_MAX_SECS");
    }

    #[test]
    fn test_get_env_helpers() {
        env::set_var("LIFEFORM_TEST_FLOAT", "0.25");
        assert_eq!(get_env_float("LIFEFORM_TEST_FLOAT", 0.0), 0.25);
        assert_eq!(get_env_int("LIFEFORM_TEST_MISSING", 9u64), 9);
        env::remove_var("LIFEFORM_TEST_FLOAT");
    }
}
