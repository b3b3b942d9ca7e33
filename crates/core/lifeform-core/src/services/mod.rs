//! Runtime services
//!
//! Bottom-up: the emotion engine and decision maker are plain synchronous
//! components; the queue, worker, dispatcher and scheduler put them on
//! Tokio tasks; [`AIBrain`] ties everything together.

pub mod brain;
pub mod decision_maker;
pub mod dispatch;
pub mod emotion_engine;
pub mod scheduler;
pub mod stimulus_queue;
pub mod worker;

pub use brain::{AIBrain, BrainStats};
pub use decision_maker::DecisionMaker;
pub use dispatch::{DispatchStats, Dispatcher};
pub use emotion_engine::{decay_factor, EmotionEngine};
pub use scheduler::{Scheduler, ThoughtTimer, ThoughtTrigger};
pub use stimulus_queue::{AckReceiver, AckSender, Envelope, QueueStats, StimulusQueue};
pub use worker::{EngineCounters, EngineStats, EngineWorker};
