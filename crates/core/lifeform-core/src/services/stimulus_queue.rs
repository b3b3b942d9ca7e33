//! Stimulus Queue
//!
//! Bounded multi-producer, single-consumer intake for the emotion engine.
//! Entries are served High before Normal before Low and FIFO by enqueue
//! sequence inside a tier. Producers only hold the lock for the push.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::config::{OverflowPolicy, QueueConfig};
use crate::error::{CoreError, Result};
use crate::types::{EmotionState, Priority, Stimulus};

/// Completion signal for a stimulus: the snapshot right after it was
/// applied, or the reason it was not
pub type AckSender = oneshot::Sender<Result<Arc<EmotionState>>>;

/// Receiving side of an [`AckSender`]
pub type AckReceiver = oneshot::Receiver<Result<Arc<EmotionState>>>;

/// A queued stimulus
#[derive(Debug)]
pub struct Envelope {
    /// Enqueue sequence number, unique per queue
    pub seq: u64,
    /// The stimulus itself
    pub stimulus: Stimulus,
    /// Completion signal, when the producer waits for application
    pub ack: Option<AckSender>,
}

impl Envelope {
    /// Report the outcome to the waiting producer, if any
    pub fn complete(self, outcome: Result<Arc<EmotionState>>) {
        if let Some(ack) = self.ack {
            let _ = ack.send(outcome);
        }
    }
}

/// Queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Stimuli accepted
    pub enqueued: u64,
    /// Accepted stimuli later evicted by `DropOldest`
    pub dropped: u64,
    /// Stimuli refused by `RejectNewest`
    pub rejected: u64,
    /// Stimuli handed to the consumer and finished
    pub processed: u64,
    /// Currently queued
    pub depth: usize,
}

#[derive(Debug, Default)]
struct Inner {
    tiers: [VecDeque<Envelope>; 3],
    next_seq: u64,
    closed: bool,
    stats: QueueStats,
}

impl Inner {
    fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }
}

fn tier(priority: Priority) -> usize {
    match priority {
        Priority::High => 0,
        Priority::Normal => 1,
        Priority::Low => 2,
    }
}

/// Prioritized bounded stimulus queue
#[derive(Debug)]
pub struct StimulusQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl StimulusQueue {
    /// Create a queue
    pub fn new(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            capacity: config.capacity,
            policy: config.overflow_policy,
        })
    }

    /// Maximum queued stimuli
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Overflow policy in force
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Enqueue without waiting for the outcome
    pub fn push(&self, stimulus: Stimulus) -> Result<u64> {
        self.enqueue(stimulus, None)
    }

    /// Enqueue and get a receiver that resolves once the stimulus is applied
    pub fn push_with_ack(&self, stimulus: Stimulus) -> Result<(u64, AckReceiver)> {
        let (tx, rx) = oneshot::channel();
        let seq = self.enqueue(stimulus, Some(tx))?;
        Ok((seq, rx))
    }

    fn enqueue(&self, stimulus: Stimulus, ack: Option<AckSender>) -> Result<u64> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(CoreError::QueueClosed);
        }

        if inner.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::RejectNewest => {
                    inner.stats.rejected += 1;
                    warn!(
                        capacity = self.capacity,
                        kind = ?stimulus.kind,
                        "Stimulus queue full, rejecting newest"
                    );
                    return Err(CoreError::overflow(self.policy, self.capacity));
                }
                OverflowPolicy::DropOldest => {
                    let evicted = inner
                        .tiers
                        .iter_mut()
                        .rev()
                        .find_map(|t| t.pop_front());
                    if let Some(evicted) = evicted {
                        inner.stats.dropped += 1;
                        warn!(
                            seq = evicted.seq,
                            kind = ?evicted.stimulus.kind,
                            "Stimulus queue full, dropping oldest"
                        );
                        evicted.complete(Err(CoreError::overflow(self.policy, self.capacity)));
                    }
                }
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.stats.enqueued += 1;
        debug!(seq, kind = ?stimulus.kind, priority = ?stimulus.priority, "Stimulus enqueued");
        inner.tiers[tier(stimulus.priority)].push_back(Envelope { seq, stimulus, ack });
        drop(inner);

        self.notify.notify_one();
        Ok(seq)
    }

    /// Take the next entry without waiting
    pub fn try_pop(&self) -> Option<Envelope> {
        self.lock().tiers.iter_mut().find_map(|t| t.pop_front())
    }

    /// Wait for the next entry
    ///
    /// Returns `None` once the queue is closed and empty, so a consumer
    /// drains everything accepted before `close`.
    pub async fn pop(&self) -> Option<Envelope> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(envelope) = inner.tiers.iter_mut().find_map(|t| t.pop_front()) {
                    return Some(envelope);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Record that the consumer finished one entry
    pub fn mark_processed(&self) {
        self.lock().stats.processed += 1;
    }

    /// Refuse further enqueues; queued entries stay available to `pop`
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Currently queued
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter snapshot
    pub fn stats(&self) -> QueueStats {
        let inner = self.lock();
        QueueStats {
            depth: inner.len(),
            ..inner.stats
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn queue(capacity: usize, policy: OverflowPolicy) -> StimulusQueue {
        StimulusQueue::new(&QueueConfig {
            capacity,
            overflow_policy: policy,
        })
        .unwrap()
    }

    #[test]
    fn test_priority_then_fifo() {
        let q = queue(16, OverflowPolicy::RejectNewest);
        let now = Utc::now();
        q.push(Stimulus::recall(0.1, 0.1, now)).unwrap();
        q.push(Stimulus::perceived(0.1, now)).unwrap();
        q.push(Stimulus::user_message(0.1, now)).unwrap();
        q.push(Stimulus::perceived(0.2, now)).unwrap();

        let order: Vec<u64> = std::iter::from_fn(|| q.try_pop()).map(|e| e.seq).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn test_reject_newest_counts_rejections() {
        let q = queue(2, OverflowPolicy::RejectNewest);
        let now = Utc::now();
        q.push(Stimulus::perceived(0.1, now)).unwrap();
        q.push(Stimulus::perceived(0.2, now)).unwrap();
        let err = q.push(Stimulus::perceived(0.3, now)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::OverflowPolicyTriggered {
                policy: OverflowPolicy::RejectNewest,
                capacity: 2
            }
        ));

        let stats = q.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.depth, 2);
    }

    #[tokio::test]
    async fn test_drop_oldest_evicts_lowest_tier_and_fails_its_ack() {
        let q = queue(2, OverflowPolicy::DropOldest);
        let now = Utc::now();
        let (_, low_ack) = q.push_with_ack(Stimulus::recall(0.1, 0.1, now)).unwrap();
        q.push(Stimulus::user_message(0.1, now)).unwrap();
        q.push(Stimulus::user_message(0.2, now)).unwrap();

        let outcome = low_ack.await.unwrap();
        assert!(matches!(outcome, Err(CoreError::OverflowPolicyTriggered { .. })));

        let stats = q.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.enqueued, 3);
        assert_eq!(q.len(), 2);
        assert_eq!(q.try_pop().unwrap().seq, 1);
    }

    #[tokio::test]
    async fn test_close_rejects_enqueue_but_drains() {
        let q = queue(4, OverflowPolicy::DropOldest);
        q.push(Stimulus::perceived(0.1, Utc::now())).unwrap();
        q.close();

        assert!(matches!(
            q.push(Stimulus::perceived(0.2, Utc::now())),
            Err(CoreError::QueueClosed)
        ));
        assert!(q.pop().await.is_some());
        assert!(q.pop().await.is_none());
    }

    #[test]
    fn test_pop_returns_queued_entry_immediately() {
        let q = queue(4, OverflowPolicy::DropOldest);
        q.push(Stimulus::tick(Utc::now())).unwrap();
        let envelope = tokio_test::block_on(q.pop()).unwrap();
        assert_eq!(envelope.seq, 0);
        assert!(envelope.ack.is_none());
        q.mark_processed();
        assert_eq!(q.stats().processed, 1);
    }

    #[tokio::test]
    async fn test_pop_waits_for_producer() {
        let q = Arc::new(queue(4, OverflowPolicy::DropOldest));
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.pop().await.map(|e| e.seq) })
        };
        tokio::task::yield_now().await;
        q.push(Stimulus::perceived(0.5, Utc::now())).unwrap();
        assert_eq!(consumer.await.unwrap(), Some(0));
    }
}
