//! AIBrain
//!
//! Public entry point of the core. Wires the stimulus queue, engine worker,
//! scheduler, decision maker and dispatcher together and exposes the
//! inbound API used by conversation, perception and feedback collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::BrainConfig;
use crate::error::{CoreError, Result};
use crate::ports::{ActionHandler, MemoryPort, StateObserver};
use crate::services::decision_maker::DecisionMaker;
use crate::services::dispatch::{DispatchStats, Dispatcher};
use crate::services::emotion_engine::EmotionEngine;
use crate::services::scheduler::{Scheduler, ThoughtTrigger};
use crate::services::stimulus_queue::{QueueStats, StimulusQueue};
use crate::services::worker::{EngineCounters, EngineStats, EngineWorker};
use crate::types::{
    Action, ActionKind, ActionPreferences, Adjustment, EmotionHistory, EmotionKind, EmotionState,
    MemoryHint, Outcome, PersonalityProfile, PreferenceAdjustment, Stimulus, StimulusKind, Trigger,
};

/// Combined counters of a brain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainStats {
    /// Stimulus queue
    pub queue: QueueStats,
    /// Engine worker
    pub engine: EngineStats,
    /// Outbound dispatch
    pub dispatch: DispatchStats,
    /// Decision cycles completed
    pub decisions: u64,
}

struct BrainInner {
    config: BrainConfig,
    queue: Arc<StimulusQueue>,
    state_rx: watch::Receiver<Arc<EmotionState>>,
    personality: Mutex<Arc<PersonalityProfile>>,
    preferences: Mutex<Arc<ActionPreferences>>,
    history: Arc<Mutex<EmotionHistory>>,
    decision_maker: DecisionMaker,
    dispatcher: Arc<Dispatcher>,
    memory: RwLock<Option<Arc<dyn MemoryPort>>>,
    decisions: Mutex<VecDeque<Action>>,
    decision_count: AtomicU64,
    engine_counters: Arc<EngineCounters>,
    running: AtomicBool,
}

impl BrainInner {
    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::not_ready("brain is not running"))
        }
    }

    fn personality(&self) -> Arc<PersonalityProfile> {
        self.personality
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn preferences(&self) -> Arc<ActionPreferences> {
        self.preferences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Decay ticks come from the scheduler only
    fn check_inbound(stimulus: &Stimulus) -> Result<()> {
        stimulus.validate()?;
        if stimulus.kind == StimulusKind::SystemTick {
            return Err(CoreError::validation(
                "system ticks are generated by the scheduler and cannot be submitted",
            ));
        }
        Ok(())
    }

    async fn memory_hint(&self) -> Option<MemoryHint> {
        let port = self
            .memory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;

        let timeout = self.config.dispatch.memory_timeout();
        match tokio::time::timeout(timeout, port.recent_summary()).await {
            Ok(Ok(hint)) => Some(hint),
            Ok(Err(e)) => {
                warn!(error = %e, "Memory summary unavailable, deciding without it");
                Some(MemoryHint::empty())
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Memory summary timed out, deciding without it"
                );
                Some(MemoryHint::empty())
            }
        }
    }

    /// Decide from `state`, record, dispatch
    async fn decide_with(&self, state: &EmotionState, trigger: Trigger) -> Result<Action> {
        let personality = self.personality();
        let preferences = self.preferences();
        let hint = self.memory_hint().await;
        let action = self.decision_maker.decide_with_preferences(
            state,
            &personality,
            hint.as_ref(),
            &preferences,
            trigger,
        )?;

        info!(
            action = %action.kind,
            trigger = ?trigger,
            id = %action.id,
            rationale = %action.rationale.summary,
            "Action selected"
        );

        {
            let mut log = self.decisions.lock().unwrap_or_else(|e| e.into_inner());
            log.push_back(action.clone());
            while log.len() > self.config.dispatch.decision_log_capacity {
                log.pop_front();
            }
        }
        self.decision_count.fetch_add(1, Ordering::Relaxed);

        self.dispatcher.dispatch(&action);
        Ok(action)
    }

    async fn decide_now(&self, trigger: Trigger) -> Result<Action> {
        self.ensure_running()?;
        let state = self.state_rx.borrow().clone();
        self.decide_with(&state, trigger).await
    }
}

#[async_trait]
impl ThoughtTrigger for BrainInner {
    async fn on_thought(&self) {
        if let Err(e) = self.decide_now(Trigger::Autonomous).await {
            warn!(error = %e, "Autonomous thought skipped");
        }
    }
}

/// The emotion and decision core of a lifeform
pub struct AIBrain {
    inner: Arc<BrainInner>,
    scheduler: Scheduler,
    pending_worker: Mutex<Option<EngineWorker>>,
}

impl AIBrain {
    /// Build a brain from configuration; nothing runs until [`AIBrain::run`]
    pub fn new(config: BrainConfig) -> Result<Self> {
        config.validate()?;
        let clock = Arc::new(MonotonicClock::new());
        let engine = EmotionEngine::new(config.emotion.clone(), clock.now())?;
        Self::assemble(config, engine, clock)
    }

    /// Build a brain that resumes from a persisted emotional state
    pub fn restore(config: BrainConfig, state: EmotionState) -> Result<Self> {
        config.validate()?;
        let clock = Arc::new(MonotonicClock::anchored_at(
            state.last_updated().max(Utc::now()),
        ));
        let engine = EmotionEngine::from_state(config.emotion.clone(), state)?;
        Self::assemble(config, engine, clock)
    }

    fn assemble(
        config: BrainConfig,
        engine: EmotionEngine,
        clock: Arc<MonotonicClock>,
    ) -> Result<Self> {
        let personality = PersonalityProfile::from_config(&config.personality)?;
        let preferences = ActionPreferences::from_config(&config.learning)?;
        let history = Arc::new(Mutex::new(EmotionHistory::new(
            config.emotion.history_capacity,
        )));
        let decision_maker = DecisionMaker::new(config.decision.clone())?;
        let queue = Arc::new(StimulusQueue::new(&config.queue)?);
        let dispatcher = Arc::new(Dispatcher::new(&config.dispatch));
        let engine_counters = Arc::new(EngineCounters::default());

        let (state_tx, state_rx) = watch::channel(Arc::new(engine.snapshot()));
        let worker = EngineWorker::new(
            engine,
            queue.clone(),
            state_tx,
            dispatcher.clone(),
            engine_counters.clone(),
        )
        .with_history(history.clone());
        let scheduler = Scheduler::new(config.scheduler.clone(), clock, queue.clone())?;

        let inner = Arc::new(BrainInner {
            config,
            queue,
            state_rx,
            personality: Mutex::new(Arc::new(personality)),
            preferences: Mutex::new(Arc::new(preferences)),
            history,
            decision_maker,
            dispatcher,
            memory: RwLock::new(None),
            decisions: Mutex::new(VecDeque::new()),
            decision_count: AtomicU64::new(0),
            engine_counters,
            running: AtomicBool::new(false),
        });

        Ok(Self {
            inner,
            scheduler,
            pending_worker: Mutex::new(Some(worker)),
        })
    }

    /// Attach the memory collaborator
    pub fn with_memory(self, memory: Arc<dyn MemoryPort>) -> Self {
        *self.inner.memory.write().unwrap_or_else(|e| e.into_inner()) = Some(memory);
        self
    }

    /// Register an action handler
    pub fn on_action(&self, handler: Arc<dyn ActionHandler>) {
        self.inner.dispatcher.add_handler(handler);
    }

    /// Register a state observer; needs a Tokio runtime
    pub fn on_state_changed(&self, observer: Arc<dyn StateObserver>) -> Result<()> {
        self.inner.dispatcher.add_observer(observer)
    }

    /// Start the background tasks and return immediately
    pub async fn run(&self) -> Result<()> {
        let worker = self
            .pending_worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| CoreError::other("brain has already been started"))?;

        let thoughts: Arc<dyn ThoughtTrigger> = self.inner.clone();
        self.scheduler.start(worker, thoughts).await?;
        self.inner.running.store(true, Ordering::SeqCst);
        info!("Brain running");
        Ok(())
    }

    /// Whether [`AIBrain::run`] succeeded and shutdown has not begun
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Stop timers, drain the queue and stop the worker
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.pending_worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.scheduler.stop().await;
        self.inner.dispatcher.close_observers();
        info!(stats = ?self.stats(), "Brain shut down");
    }

    /// Enqueue a stimulus without waiting for it; returns its sequence number
    ///
    /// `SystemTick` stimuli are refused with `Validation`.
    pub fn submit_stimulus(&self, stimulus: Stimulus) -> Result<u64> {
        BrainInner::check_inbound(&stimulus)?;
        self.inner.queue.push(stimulus)
    }

    /// Apply a conversation stimulus and answer it
    ///
    /// Waits until the worker has applied the stimulus, then runs a reactive
    /// decision on the resulting state and dispatches it.
    pub async fn handle_external_stimulus(&self, stimulus: Stimulus) -> Result<Action> {
        self.inner.ensure_running()?;
        BrainInner::check_inbound(&stimulus)?;

        let (seq, ack) = self.inner.queue.push_with_ack(stimulus)?;
        let state = ack
            .await
            .map_err(|_| CoreError::other(format!("stimulus {} was never applied", seq)))??;

        self.inner.decide_with(&state, Trigger::Reactive).await
    }

    /// Run a decision cycle now on the current state
    pub async fn decide(&self, trigger: Trigger) -> Result<Action> {
        self.inner.decide_now(trigger).await
    }

    /// Apply bounded feedback to one personality trait
    pub fn submit_feedback(
        &self,
        trait_name: &str,
        delta: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Adjustment> {
        let mut current = self
            .inner
            .personality
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut next = (**current).clone();
        let adjustment = next.apply_feedback(trait_name, delta, timestamp)?;
        *current = Arc::new(next);

        info!(
            trait_name,
            requested = adjustment.requested,
            applied = adjustment.applied,
            "Personality adjusted"
        );
        Ok(adjustment)
    }

    /// Undo the latest feedback adjustment, if any remains
    pub fn revert_feedback(&self, timestamp: DateTime<Utc>) -> Option<Adjustment> {
        let mut current = self
            .inner
            .personality
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut next = (**current).clone();
        let adjustment = next.revert_last(timestamp)?;
        *current = Arc::new(next);
        info!(trait_name = %adjustment.trait_name, "Personality adjustment reverted");
        Some(adjustment)
    }

    /// Learn from the observed outcome of an action
    ///
    /// Nudges the learned bias of `action` within the configured bound; the
    /// next decision cycle sees the new value.
    pub fn record_outcome(
        &self,
        action: ActionKind,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    ) -> Result<PreferenceAdjustment> {
        let mut current = self
            .inner
            .preferences
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut next = (**current).clone();
        let adjustment = next.record_outcome(action, outcome, timestamp)?;
        *current = Arc::new(next);

        info!(
            action = %action,
            reaction = ?outcome.reaction,
            success = outcome.success,
            applied = adjustment.applied,
            bias = adjustment.bias,
            "Action preference adjusted"
        );
        Ok(adjustment)
    }

    /// Current learned action preferences
    pub fn action_preferences(&self) -> Arc<ActionPreferences> {
        self.inner.preferences()
    }

    /// Retained emotional snapshots, oldest first
    pub fn emotion_history(&self) -> Vec<Arc<EmotionState>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshots()
            .cloned()
            .collect()
    }

    /// Levels of `kind` over the last `window` of retained history, oldest first
    pub fn emotion_trend(&self, kind: &EmotionKind, window: chrono::Duration) -> Vec<f64> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .trend(kind, window)
    }

    /// Latest published emotional state
    pub fn emotion_snapshot(&self) -> Arc<EmotionState> {
        self.inner.state_rx.borrow().clone()
    }

    /// Receiver that sees every published state
    pub fn subscribe_state(&self) -> watch::Receiver<Arc<EmotionState>> {
        self.inner.state_rx.clone()
    }

    /// Current personality profile
    pub fn personality_snapshot(&self) -> Arc<PersonalityProfile> {
        self.inner.personality()
    }

    /// Most recent decisions, oldest first
    pub fn recent_decisions(&self) -> Vec<Action> {
        self.inner
            .decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Counters
    pub fn stats(&self) -> BrainStats {
        BrainStats {
            queue: self.inner.queue.stats(),
            engine: self.inner.engine_counters.snapshot(),
            dispatch: self.inner.dispatcher.stats(),
            decisions: self.inner.decision_count.load(Ordering::Relaxed),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &BrainConfig {
        &self.inner.config
    }
}
