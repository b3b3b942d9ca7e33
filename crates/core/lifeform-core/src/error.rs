//! Error types for the lifeform core

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::OverflowPolicy;

/// Main error type for emotion and decision operations
///
/// None of these are fatal: the engine worker logs the rejection and keeps
/// consuming the queue.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed stimulus, feedback or request payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Tick timestamp did not advance past the last applied tick
    #[error("Clock ordering violation: tick at {attempted} does not advance past {last_updated}")]
    ClockOrdering {
        /// Timestamp of the last applied tick
        last_updated: DateTime<Utc>,
        /// Rejected tick timestamp
        attempted: DateTime<Utc>,
    },

    /// Decision requested before emotion state or personality exist
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Stimulus queue at capacity, resolved by the configured policy
    #[error("Stimulus queue overflow ({policy:?}) at capacity {capacity}")]
    OverflowPolicyTriggered {
        /// Policy that resolved the overflow
        policy: OverflowPolicy,
        /// Configured queue capacity
        capacity: usize,
    },

    /// Stimulus queue was closed by shutdown
    #[error("Stimulus queue is closed")]
    QueueClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Outbound dispatch error reported by a collaborator
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    /// Create a not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        CoreError::NotReady(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Config(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        CoreError::Dispatch(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        CoreError::Other(msg.into())
    }

    /// Create a clock ordering error
    pub fn clock_ordering(last_updated: DateTime<Utc>, attempted: DateTime<Utc>) -> Self {
        CoreError::ClockOrdering {
            last_updated,
            attempted,
        }
    }

    /// Create an overflow error
    pub fn overflow(policy: OverflowPolicy, capacity: usize) -> Self {
        CoreError::OverflowPolicyTriggered { policy, capacity }
    }

    /// Short machine-readable name, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::ClockOrdering { .. } => "clock_ordering",
            CoreError::NotReady(_) => "not_ready",
            CoreError::OverflowPolicyTriggered { .. } => "overflow",
            CoreError::QueueClosed => "queue_closed",
            CoreError::Config(_) => "config",
            CoreError::Dispatch(_) => "dispatch",
            CoreError::Serialization(_) => "serialization",
            CoreError::Io(_) => "io",
            CoreError::Other(_) => "other",
        }
    }
}
