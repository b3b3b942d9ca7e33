//! Lifeform Emotion & Decision Core
//!
//! The affective heart of a persistent digital lifeform. Behavior is driven
//! by internal state instead of request/response logic:
//!
//! - A bounded multi-dimensional emotional state that decays toward
//!   baselines over time
//! - A prioritized, bounded stimulus queue fed by perception, conversation
//!   and memory collaborators
//! - A single engine worker that applies stimuli in one total order
//! - A deterministic, explainable decision policy blending emotion,
//!   personality, recent memory and preferences learned from outcomes
//! - A bounded history of published states with trend queries
//! - Timers for decay and autonomous thought with ordered shutdown
//!
//! # Example
//!
//! ```no_run
//! use lifeform_core::*;
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let brain = AIBrain::new(BrainConfig::from_env()?)?;
//!     brain.run().await?;
//!
//!     let action = brain
//!         .handle_external_stimulus(Stimulus::user_message(0.7, Utc::now()))
//!         .await?;
//!     println!("{}: {}", action.kind, action.rationale.summary);
//!
//!     brain.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use uuid::Uuid;

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod ports;
pub mod services;
pub mod types;

pub use clock::{Clock, MonotonicClock};
pub use config::{
    load_env, ActionWeights, BrainConfig, DecisionWeights, DimensionConfig, DispatchConfig,
    EmotionConfig, LearningConfig, OverflowPolicy, PersonalityConfig, QueueConfig,
    SchedulerConfig, StimulusResponse,
};
pub use error::{CoreError, Result};
pub use logging::init_logging;
pub use ports::{ActionHandler, MemoryPort, StateObserver};
pub use services::*;
pub use types::*;
