//! Engine worker: the single consumer of the stimulus queue
//!
//! Owns the [`EmotionEngine`], applies queued stimuli one at a time in queue
//! order, and publishes each resulting snapshot to the watch channel, the
//! observers and the emotion history. Rejected stimuli are logged and
//! reported to a waiting producer; the loop always moves on.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::services::dispatch::Dispatcher;
use crate::services::emotion_engine::EmotionEngine;
use crate::services::stimulus_queue::StimulusQueue;
use crate::types::{EmotionHistory, EmotionState};

/// Worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Stimuli applied, ticks included
    pub applied: u64,
    /// Stimuli rejected by validation or clock ordering
    pub rejected: u64,
}

/// Shared counters updated by the worker
#[derive(Debug, Default)]
pub struct EngineCounters {
    applied: AtomicU64,
    rejected: AtomicU64,
}

impl EngineCounters {
    /// Counter snapshot
    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Consumer loop around the emotion engine
pub struct EngineWorker {
    engine: EmotionEngine,
    queue: Arc<StimulusQueue>,
    state_tx: watch::Sender<Arc<EmotionState>>,
    dispatcher: Arc<Dispatcher>,
    counters: Arc<EngineCounters>,
    history: Option<Arc<Mutex<EmotionHistory>>>,
}

impl EngineWorker {
    /// Wire a worker; the current engine state is published immediately
    pub fn new(
        engine: EmotionEngine,
        queue: Arc<StimulusQueue>,
        state_tx: watch::Sender<Arc<EmotionState>>,
        dispatcher: Arc<Dispatcher>,
        counters: Arc<EngineCounters>,
    ) -> Self {
        state_tx.send_replace(Arc::new(engine.snapshot()));
        Self {
            engine,
            queue,
            state_tx,
            dispatcher,
            counters,
            history: None,
        }
    }

    /// Also record every published snapshot, starting with the current one
    pub fn with_history(mut self, history: Arc<Mutex<EmotionHistory>>) -> Self {
        history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(Arc::new(self.engine.snapshot()));
        self.history = Some(history);
        self
    }

    /// Consume until the queue is closed and drained
    pub async fn run(mut self) {
        info!("Engine worker started");

        while let Some(envelope) = self.queue.pop().await {
            match self.engine.apply_stimulus(&envelope.stimulus) {
                Ok(()) => {
                    self.counters.applied.fetch_add(1, Ordering::Relaxed);
                    let snapshot = Arc::new(self.engine.snapshot());
                    self.state_tx.send_replace(snapshot.clone());
                    self.dispatcher.publish(&snapshot);
                    if let Some(history) = &self.history {
                        history
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .record(snapshot.clone());
                    }
                    debug!(seq = envelope.seq, "Stimulus applied");
                    envelope.complete(Ok(snapshot));
                }
                Err(e) => {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        seq = envelope.seq,
                        kind = ?envelope.stimulus.kind,
                        error_kind = e.kind(),
                        error = %e,
                        "Stimulus rejected"
                    );
                    envelope.complete(Err(e));
                }
            }
            self.queue.mark_processed();
        }

        info!(
            applied = self.counters.applied.load(Ordering::Relaxed),
            rejected = self.counters.rejected.load(Ordering::Relaxed),
            "Engine worker drained and stopped"
        );
    }
}
