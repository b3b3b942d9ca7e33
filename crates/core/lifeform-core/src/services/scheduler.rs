//! Scheduler
//!
//! Runs the three long-lived tasks of a brain: the decay ticker, the
//! autonomous-thought timer and the engine worker. Ticks are ordinary
//! `SystemTick` stimuli pushed through the same queue as everything else,
//! so the worker sees one total order of mutations.
//!
//! Stopping is ordered: timers are cancelled and awaited, the queue is
//! closed, the worker drains what was already accepted, and only then does
//! `stop` return.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{CoreError, Result};
use crate::services::stimulus_queue::StimulusQueue;
use crate::services::worker::EngineWorker;
use crate::types::Stimulus;

/// Callback fired by the autonomous-thought timer
#[async_trait]
pub trait ThoughtTrigger: Send + Sync {
    /// Run one autonomous decision cycle
    async fn on_thought(&self);
}

/// Random interval source for autonomous thoughts
///
/// Draws uniformly from `[min, max]` and reseeds itself from its own output
/// after every draw, so an injected seed reproduces the whole sequence.
#[derive(Debug)]
pub struct ThoughtTimer {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
}

impl ThoughtTimer {
    /// Create a timer over `[min, max]`
    pub fn new(min: Duration, max: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min_ms: min.as_millis() as u64,
            max_ms: max.as_millis() as u64,
        }
    }

    /// Next delay
    pub fn next_delay(&mut self) -> Duration {
        let ms = self.rng.gen_range(self.min_ms..=self.max_ms);
        let reseed: u64 = self.rng.gen();
        self.rng = StdRng::seed_from_u64(reseed);
        Duration::from_millis(ms)
    }
}

struct Tasks {
    decay: JoinHandle<()>,
    thought: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Owner of the background tasks
pub struct Scheduler {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    queue: Arc<StimulusQueue>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Option<Tasks>>,
    stopped: AtomicBool,
}

impl Scheduler {
    /// Create an idle scheduler
    pub fn new(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        queue: Arc<StimulusQueue>,
    ) -> Result<Self> {
        config.validate()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            clock,
            queue,
            shutdown_tx,
            tasks: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    /// Spawn the decay ticker, the thought timer and the worker
    ///
    /// Fails if already running or already stopped.
    pub async fn start(
        &self,
        worker: EngineWorker,
        thoughts: Arc<dyn ThoughtTrigger>,
    ) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoreError::other("scheduler has been stopped"));
        }
        if tasks.is_some() {
            return Err(CoreError::other("scheduler is already running"));
        }

        let worker = tokio::spawn(worker.run());
        let decay = tokio::spawn(decay_loop(
            self.config.decay_tick(),
            self.clock.clone(),
            self.queue.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let (min, max) = self.config.thought_bounds();
        let thought = tokio::spawn(thought_loop(
            ThoughtTimer::new(min, max, self.config.seed),
            thoughts,
            self.shutdown_tx.subscribe(),
        ));

        *tasks = Some(Tasks {
            decay,
            thought,
            worker,
        });

        info!(
            decay_tick_ms = self.config.decay_tick_ms,
            thought_min_ms = self.config.thought_interval_min_ms,
            thought_max_ms = self.config.thought_interval_max_ms,
            "Scheduler started"
        );
        Ok(())
    }

    /// Whether the background tasks are running
    pub async fn is_running(&self) -> bool {
        self.tasks.lock().await.is_some()
    }

    /// Stop everything and wait for the worker to drain
    ///
    /// Safe to call more than once. Once this returns no further state
    /// mutation happens and enqueueing fails with `QueueClosed`.
    pub async fn stop(&self) {
        let mut guard = self.tasks.lock().await;
        self.stopped.store(true, Ordering::SeqCst);

        let Some(tasks) = guard.take() else {
            self.queue.close();
            return;
        };

        info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(());
        for (name, handle) in [("decay", tasks.decay), ("thought", tasks.thought)] {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Timer task ended abnormally");
            }
        }

        self.queue.close();
        let pending = self.queue.len();
        if pending > 0 {
            debug!(pending, "Draining stimulus queue");
        }

        if let Err(e) = tasks.worker.await {
            error!(error = %e, "Engine worker ended abnormally");
        }
        info!("Scheduler stopped");
    }
}

async fn decay_loop(
    period: Duration,
    clock: Arc<dyn Clock>,
    queue: Arc<StimulusQueue>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                match queue.push(Stimulus::tick(clock.now())) {
                    Ok(_) => {}
                    Err(CoreError::QueueClosed) => break,
                    Err(e) => warn!(error = %e, "Decay tick not enqueued"),
                }
            }
        }
    }
    debug!("Decay ticker stopped");
}

async fn thought_loop(
    mut timer: ThoughtTimer,
    thoughts: Arc<dyn ThoughtTrigger>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let delay = timer.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Next autonomous thought scheduled");
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = tokio::time::sleep(delay) => thoughts.on_thought().await,
        }
    }
    debug!("Autonomous-thought timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use crate::config::{DispatchConfig, EmotionConfig, QueueConfig};
    use crate::services::dispatch::Dispatcher;
    use crate::services::emotion_engine::EmotionEngine;
    use crate::services::worker::EngineCounters;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::watch;

    struct CountingThoughts(AtomicUsize);

    #[async_trait]
    impl ThoughtTrigger for CountingThoughts {
        async fn on_thought(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            decay_tick_ms: 10,
            thought_interval_min_ms: 20,
            thought_interval_max_ms: 40,
            seed: Some(42),
        }
    }

    fn parts(
        clock: Arc<MonotonicClock>,
    ) -> (Arc<StimulusQueue>, EngineWorker, Arc<EngineCounters>) {
        let queue = Arc::new(StimulusQueue::new(&QueueConfig::default()).unwrap());
        let engine = EmotionEngine::new(EmotionConfig::default(), clock.now()).unwrap();
        let (tx, _rx) = watch::channel(Arc::new(engine.snapshot()));
        let counters = Arc::new(EngineCounters::default());
        let worker = EngineWorker::new(
            engine,
            queue.clone(),
            tx,
            Arc::new(Dispatcher::new(&DispatchConfig::default())),
            counters.clone(),
        );
        (queue, worker, counters)
    }

    #[test]
    fn test_thought_timer_is_reproducible_and_bounded() {
        let min = Duration::from_secs(120);
        let max = Duration::from_secs(600);
        let mut a = ThoughtTimer::new(min, max, Some(7));
        let mut b = ThoughtTimer::new(min, max, Some(7));
        for _ in 0..100 {
            let d = a.next_delay();
            assert_eq!(d, b.next_delay());
            assert!(d >= min && d <= max);
        }
    }

    #[tokio::test]
    async fn test_ticks_and_thoughts_fire_then_stop_cleanly() {
        let clock = Arc::new(MonotonicClock::new());
        let (queue, worker, counters) = parts(clock.clone());
        let scheduler = Scheduler::new(fast_config(), clock, queue.clone()).unwrap();
        let thoughts = Arc::new(CountingThoughts(AtomicUsize::new(0)));

        scheduler.start(worker, thoughts.clone()).await.unwrap();
        assert!(scheduler.is_running().await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop().await;

        let stats = counters.snapshot();
        assert!(stats.applied >= 3, "expected decay ticks, got {:?}", stats);
        assert_eq!(stats.rejected, 0);
        assert!(thoughts.0.load(Ordering::SeqCst) >= 1);
        assert!(queue.is_closed());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_final() {
        let clock = Arc::new(MonotonicClock::new());
        let (queue, worker, _) = parts(clock.clone());
        let scheduler = Scheduler::new(fast_config(), clock.clone(), queue.clone()).unwrap();
        let thoughts = Arc::new(CountingThoughts(AtomicUsize::new(0)));

        scheduler.start(worker, thoughts.clone()).await.unwrap();
        scheduler.stop().await;
        scheduler.stop().await;

        assert!(!scheduler.is_running().await);
        assert!(matches!(
            queue.push(Stimulus::tick(clock.now())),
            Err(CoreError::QueueClosed)
        ));

        let (_, worker, _) = parts(clock);
        assert!(scheduler.start(worker, thoughts).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_without_start_closes_queue() {
        let clock = Arc::new(MonotonicClock::new());
        let queue = Arc::new(StimulusQueue::new(&QueueConfig::default()).unwrap());
        let scheduler = Scheduler::new(fast_config(), clock, queue.clone()).unwrap();
        scheduler.stop().await;
        assert!(queue.is_closed());
    }
}
