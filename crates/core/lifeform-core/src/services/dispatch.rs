//! Outbound delivery of actions and state snapshots
//!
//! Actions go to every registered handler on its own task, bounded by the
//! dispatch timeout. Snapshots go to each observer through a small bounded
//! channel; when an observer falls behind, new snapshots are dropped and
//! counted rather than queued.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::DispatchConfig;
use crate::error::{CoreError, Result};
use crate::ports::{ActionHandler, StateObserver};
use crate::types::{Action, EmotionState};

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Handler invocations started
    pub dispatched: u64,
    /// Handler invocations that returned an error
    pub failed: u64,
    /// Handler invocations abandoned at the timeout
    pub timed_out: u64,
    /// Snapshots not delivered because an observer buffer was full
    pub snapshots_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    snapshots_dropped: AtomicU64,
}

/// Fan-out to action handlers and state observers
pub struct Dispatcher {
    handlers: RwLock<Vec<Arc<dyn ActionHandler>>>,
    observers: RwLock<Vec<mpsc::Sender<Arc<EmotionState>>>>,
    timeout: Duration,
    observer_buffer: usize,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Create a dispatcher with no subscribers
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
            timeout: config.dispatch_timeout(),
            observer_buffer: config.observer_buffer,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Register an action handler
    pub fn add_handler(&self, handler: Arc<dyn ActionHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    /// Register a state observer
    ///
    /// Starts the observer's delivery task, so this needs a Tokio runtime.
    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CoreError::other("state observers need a running Tokio runtime"))?;

        let (tx, mut rx) = mpsc::channel::<Arc<EmotionState>>(self.observer_buffer);
        runtime.spawn(async move {
            while let Some(state) = rx.recv().await {
                observer.on_state_changed(state).await;
            }
        });

        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        Ok(())
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Send an action to every handler without waiting for them
    pub fn dispatch(&self, action: &Action) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        if handlers.is_empty() {
            debug!(action = %action.kind, id = %action.id, "No action handlers registered");
            return;
        }

        for handler in handlers {
            let action = action.clone();
            let counters = self.counters.clone();
            let timeout = self.timeout;
            counters.dispatched.fetch_add(1, Ordering::Relaxed);

            tokio::spawn(async move {
                let id = action.id;
                let kind = action.kind;
                match tokio::time::timeout(timeout, handler.on_action(action)).await {
                    Ok(Ok(())) => debug!(action = %kind, %id, "Action delivered"),
                    Ok(Err(e)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(action = %kind, %id, error = %e, "Action handler failed");
                    }
                    Err(_) => {
                        counters.timed_out.fetch_add(1, Ordering::Relaxed);
                        error!(
                            action = %kind,
                            %id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Action handler timed out"
                        );
                    }
                }
            });
        }
    }

    /// Offer a snapshot to every observer without blocking
    pub fn publish(&self, state: &Arc<EmotionState>) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for tx in observers.iter() {
            match tx.try_send(state.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.counters.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
                    warn!("State observer is behind, snapshot dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("State observer task has stopped");
                }
            }
        }
    }

    /// Stop every observer task once it has drained its buffer
    pub fn close_observers(&self) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Counter snapshot
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            snapshots_dropped: self.counters.snapshots_dropped.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handler_count())
            .field("timeout", &self.timeout)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockActionHandler, MockStateObserver};
    use crate::types::{ActionKind, Rationale, Trigger};
    use chrono::Utc;
    use tokio::sync::Notify;

    fn action() -> Action {
        Action {
            id: uuid::Uuid::new_v4(),
            kind: ActionKind::Observe,
            trigger: Trigger::Autonomous,
            rationale: Rationale {
                scores: Vec::new(),
                factors: Vec::new(),
                summary: "observe".into(),
            },
            decided_at: Utc::now(),
        }
    }

    fn config(timeout_ms: u64) -> DispatchConfig {
        DispatchConfig {
            dispatch_timeout_ms: timeout_ms,
            ..Default::default()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_retried() {
        let dispatcher = Dispatcher::new(&config(500));
        let mut handler = MockActionHandler::new();
        handler
            .expect_on_action()
            .times(1)
            .returning(|_| Err(CoreError::dispatch("voice offline")));
        dispatcher.add_handler(Arc::new(handler));

        dispatcher.dispatch(&action());
        settle().await;

        let stats = dispatcher.stats();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.failed, 1);
    }

    struct SlowHandler;

    #[async_trait::async_trait]
    impl ActionHandler for SlowHandler {
        async fn on_action(&self, _action: Action) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let dispatcher = Dispatcher::new(&config(10));
        dispatcher.add_handler(Arc::new(SlowHandler));

        dispatcher.dispatch(&action());
        settle().await;

        assert_eq!(dispatcher.stats().timed_out, 1);
    }

    struct BlockedObserver {
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl StateObserver for BlockedObserver {
        async fn on_state_changed(&self, _state: Arc<EmotionState>) {
            self.release.notified().await;
        }
    }

    #[tokio::test]
    async fn test_full_observer_buffer_drops_snapshots() {
        let dispatcher = Dispatcher::new(&DispatchConfig::default());
        let release = Arc::new(Notify::new());
        dispatcher
            .add_observer(Arc::new(BlockedObserver {
                release: release.clone(),
            }))
            .unwrap();

        let state = Arc::new(EmotionState::mid_range(Utc::now()));
        // first is taken by the blocked task, second fills the buffer
        dispatcher.publish(&state);
        settle().await;
        dispatcher.publish(&state);
        dispatcher.publish(&state);
        dispatcher.publish(&state);

        assert_eq!(dispatcher.stats().snapshots_dropped, 2);
        release.notify_waiters();
    }

    #[tokio::test]
    async fn test_observer_receives_snapshot() {
        let dispatcher = Dispatcher::new(&DispatchConfig::default());
        let mut observer = MockStateObserver::new();
        observer.expect_on_state_changed().times(1).return_const(());
        dispatcher.add_observer(Arc::new(observer)).unwrap();

        dispatcher.publish(&Arc::new(EmotionState::mid_range(Utc::now())));
        settle().await;
        dispatcher.close_observers();
        assert_eq!(dispatcher.stats().snapshots_dropped, 0);
    }

    #[test]
    fn test_observer_needs_runtime() {
        let dispatcher = Dispatcher::new(&DispatchConfig::default());
        let observer = MockStateObserver::new();
        assert!(dispatcher.add_observer(Arc::new(observer)).is_err());
    }
}
