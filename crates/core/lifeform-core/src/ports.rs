//! Ports to external collaborators
//!
//! The core never talks to voice, avatar, perception or storage directly.
//! Those subsystems implement these traits and register with `AIBrain`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Action, EmotionState, MemoryHint};

/// Receives every dispatched action
///
/// Called on a spawned task under the dispatch timeout. Errors and
/// timeouts are logged and never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Act on a decision
    async fn on_action(&self, action: Action) -> Result<()>;
}

/// Receives emotion snapshots after each applied stimulus
///
/// Delivery goes through a small per-observer buffer. A slow observer
/// misses snapshots instead of slowing the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateObserver: Send + Sync {
    /// A new snapshot was published
    async fn on_state_changed(&self, state: Arc<EmotionState>);
}

/// Summarized recent memory used to bias decisions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryPort: Send + Sync {
    /// Summary of recent interactions
    async fn recent_summary(&self) -> Result<MemoryHint>;
}
