//! Core data model
//!
//! - EmotionState: bounded affective dimensions
//! - PersonalityProfile: trait weights with an adjustment log
//! - Stimulus: timestamped inputs for the emotion engine
//! - Action: decisions with their rationale
//! - MemoryHint: recent-memory summary used when deciding
//! - EmotionHistory: bounded trail of published snapshots
//! - ActionPreferences: per-action bias learned from outcomes

mod action;
mod emotion;
mod history;
mod memory;
mod personality;
mod preference;
mod stimulus;

pub use action::*;
pub use emotion::*;
pub use history::*;
pub use memory::*;
pub use personality::*;
pub use preference::*;
pub use stimulus::*;
