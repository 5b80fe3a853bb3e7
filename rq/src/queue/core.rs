//! Queue actor - sole owner of the bookkeeping state
//!
//! Every command is handled to completion before the next one is read, so the
//! waiter lists, pending order, running set and retry counters are never
//! mutated concurrently.

use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use recencycache::Cache;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::delivery::Delivery;
use crate::operation::{Operation, Outcome};

use super::QueueKey;
use super::config::QueueConfig;
use super::messages::{QueueCommand, QueueState, QueueStats, Subscriber};

/// An operation attempt in flight
struct Attempt {
    id: u64,
    abort: AbortHandle,
}

/// Bookkeeping owned by the actor task
pub(crate) struct QueueCore<K, V, E> {
    config: QueueConfig,
    operation: Arc<dyn Operation<K, V, E>>,
    cache: Option<Arc<dyn Cache<K, V>>>,
    delivery: Arc<dyn Delivery>,

    /// Handed to attempt tasks so they don't keep the actor alive
    tx: mpsc::WeakSender<QueueCommand<K, V, E>>,

    /// Subscribers per tracked key, in registration order
    waiters: HashMap<K, Vec<Subscriber<K, V, E>>>,

    /// Keys awaiting a slot, FIFO
    pending: VecDeque<K>,

    /// Keys with an attempt in flight
    running: HashMap<K, Attempt>,

    /// Failed attempts in the current lifecycle of a key
    retries: HashMap<K, u32>,

    next_attempt: u64,
    stats: QueueStats,
}

impl<K, V, E> QueueCore<K, V, E>
where
    K: QueueKey,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new(
        config: QueueConfig,
        operation: Arc<dyn Operation<K, V, E>>,
        cache: Option<Arc<dyn Cache<K, V>>>,
        delivery: Arc<dyn Delivery>,
        tx: mpsc::WeakSender<QueueCommand<K, V, E>>,
    ) -> Self {
        debug!(?config, cache = cache.is_some(), "QueueCore::new: called");
        Self {
            config,
            operation,
            cache,
            delivery,
            tx,
            waiters: HashMap::new(),
            pending: VecDeque::new(),
            running: HashMap::new(),
            retries: HashMap::new(),
            next_attempt: 0,
            stats: QueueStats::default(),
        }
    }

    /// Process commands until shutdown or until every sender is gone
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<QueueCommand<K, V, E>>) {
        debug!("QueueCore::run: actor started");

        while let Some(cmd) = rx.recv().await {
            match cmd {
                QueueCommand::Add { key, subscriber } => self.add(key, subscriber),
                QueueCommand::Remove { key } => self.remove(&key),
                QueueCommand::RemoveAll => self.remove_all(),
                QueueCommand::Cancel { key, reply } => {
                    let cancelled = self.cancel(&key);
                    let _ = reply.send(cancelled);
                }
                QueueCommand::Completed { key, attempt, outcome } => self.complete(key, attempt, outcome),
                QueueCommand::Panicked { key, attempt } => self.abandon(key, attempt),
                QueueCommand::GetState { reply } => {
                    let _ = reply.send(self.state());
                }
                QueueCommand::GetStats { reply } => {
                    let _ = reply.send(self.stats.clone());
                }
                QueueCommand::Shutdown => {
                    debug!("QueueCore::run: shutdown requested");
                    break;
                }
            }
        }

        self.abort_running();
        info!(stats = ?self.stats, "Request queue stopped");
    }

    fn add(&mut self, key: K, subscriber: Subscriber<K, V, E>) {
        debug!(?key, "QueueCore::add: called");
        self.stats.submitted += 1;

        match self.waiters.get_mut(&key) {
            Some(subscribers) => {
                debug!(?key, waiting = subscribers.len(), "QueueCore::add: coalescing with tracked key");
                self.stats.coalesced += 1;
                subscribers.push(subscriber);
            }
            None => {
                if self.running.contains_key(&key) {
                    // Removed while running: the new subscribers take over the attempt in flight
                    debug!(?key, "QueueCore::add: adopting running attempt");
                    self.stats.coalesced += 1;
                } else {
                    self.pending.push_back(key.clone());
                }
                self.waiters.insert(key, vec![subscriber]);
            }
        }

        self.run_next();
    }

    fn remove(&mut self, key: &K) {
        debug!(?key, "QueueCore::remove: called");
        let dropped = self.waiters.remove(key).map_or(0, |subscribers| subscribers.len());
        self.pending.retain(|pending| pending != key);
        self.retries.remove(key);

        debug!(?key, dropped, "QueueCore::remove: subscribers dropped");
    }

    fn remove_all(&mut self) {
        debug!(
            tracked = self.waiters.len(),
            running = self.running.len(),
            "QueueCore::remove_all: called"
        );
        self.abort_running();
        self.waiters.clear();
        self.pending.clear();
        self.retries.clear();
    }

    fn cancel(&mut self, key: &K) -> bool {
        debug!(?key, "QueueCore::cancel: called");
        let tracked = self.waiters.remove(key).is_some();
        self.pending.retain(|pending| pending != key);
        self.retries.remove(key);

        let running = match self.running.remove(key) {
            Some(attempt) => {
                debug!(?key, attempt = attempt.id, "QueueCore::cancel: aborting running attempt");
                attempt.abort.abort();
                true
            }
            None => false,
        };

        if !(tracked || running) {
            debug!(?key, "QueueCore::cancel: key not tracked");
            return false;
        }

        self.stats.cancelled += 1;
        if running {
            self.run_next();
        }
        true
    }

    /// Completion protocol for one attempt
    fn complete(&mut self, key: K, attempt: u64, outcome: Outcome<V, E>) {
        debug!(?key, attempt, failed = outcome.is_failure(), "QueueCore::complete: called");

        if !self.release(&key, attempt) {
            debug!(?key, attempt, "QueueCore::complete: stale attempt, ignoring");
            self.stats.stale += 1;
            return;
        }

        if !self.waiters.contains_key(&key) {
            debug!(?key, "QueueCore::complete: no subscribers left, discarding outcome");
            self.retries.remove(&key);
            self.stats.discarded += 1;
            self.run_next();
            return;
        }

        if let (Some(cache), Some(value)) = (&self.cache, &outcome.value) {
            debug!(?key, "QueueCore::complete: caching value");
            cache.set(key.clone(), value.clone());
        }

        if self.should_retry(&key, &outcome) {
            let retried = self.retries.entry(key.clone()).or_insert(0);
            *retried += 1;
            debug!(?key, retried = *retried, "QueueCore::complete: re-queuing failed attempt");
            self.stats.retried += 1;
            self.pending.push_back(key);
        } else {
            self.retries.remove(&key);
            self.deliver(key, outcome);
        }

        self.run_next();
    }

    /// An attempt panicked: free its slot and end the key's lifecycle undelivered
    fn abandon(&mut self, key: K, attempt: u64) {
        if !self.release(&key, attempt) {
            debug!(?key, attempt, "QueueCore::abandon: stale attempt, ignoring");
            self.stats.stale += 1;
            return;
        }

        let dropped = self.waiters.remove(&key).map_or(0, |subscribers| subscribers.len());
        self.retries.remove(&key);
        self.stats.abandoned += 1;
        error!(?key, attempt, dropped, "Operation panicked, subscribers dropped without outcome");

        self.run_next();
    }

    /// Retry only on error, with budget left
    fn should_retry(&self, key: &K, outcome: &Outcome<V, E>) -> bool {
        let max = self.config.max_retry_times;
        outcome.is_failure() && max > 0 && self.retries.get(key).is_none_or(|retried| *retried < max)
    }

    /// Drop the running entry if it belongs to `attempt`
    fn release(&mut self, key: &K, attempt: u64) -> bool {
        match self.running.get(key) {
            Some(running) if running.id == attempt => {
                self.running.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Hand the outcome to every subscriber of `key` on the delivery context
    fn deliver(&mut self, key: K, outcome: Outcome<V, E>) {
        let Some(subscribers) = self.waiters.remove(&key) else {
            return;
        };
        debug!(?key, subscribers = subscribers.len(), "QueueCore::deliver: called");
        self.stats.delivered += 1;

        self.delivery.deliver(Box::new(move || {
            for subscriber in subscribers {
                if catch_unwind(AssertUnwindSafe(|| subscriber(&key, &outcome))).is_err() {
                    error!(?key, "Subscriber callback panicked");
                }
            }
        }));
    }

    /// Start pending keys while slots are free
    fn run_next(&mut self) {
        while self.running.len() < self.config.concurrency_limit {
            let Some(key) = self.pending.pop_front() else {
                break;
            };
            self.start(key);
        }
        self.stats.peak_running = self.stats.peak_running.max(self.running.len());
    }

    fn start(&mut self, key: K) {
        self.next_attempt += 1;
        let attempt = self.next_attempt;
        debug!(?key, attempt, running = self.running.len(), "QueueCore::start: called");

        let operation = self.operation.clone();
        let tx = self.tx.clone();
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let execute_key = task_key.clone();
            let result = AssertUnwindSafe(async move { operation.execute(execute_key).await })
                .catch_unwind()
                .await;

            let cmd = match result {
                Ok(outcome) => QueueCommand::Completed {
                    key: task_key,
                    attempt,
                    outcome,
                },
                Err(_) => QueueCommand::Panicked { key: task_key, attempt },
            };

            match tx.upgrade() {
                Some(tx) => {
                    if tx.send(cmd).await.is_err() {
                        debug!(attempt, "attempt finished after queue stopped");
                    }
                }
                None => debug!(attempt, "attempt finished after queue dropped"),
            }
        });

        self.stats.started += 1;
        self.running.insert(
            key,
            Attempt {
                id: attempt,
                abort: handle.abort_handle(),
            },
        );
    }

    fn abort_running(&mut self) {
        if !self.running.is_empty() {
            warn!(running = self.running.len(), "Aborting in-flight operations");
        }
        for (key, attempt) in self.running.drain() {
            debug!(?key, attempt = attempt.id, "QueueCore::abort_running: aborting");
            attempt.abort.abort();
        }
    }

    fn state(&self) -> QueueState<K> {
        QueueState {
            pending: self.pending.iter().cloned().collect(),
            running: self.running.keys().cloned().collect(),
            tracked: self.waiters.len(),
            subscribers: self.waiters.values().map(Vec::len).sum(),
            retries: self.retries.clone(),
        }
    }
}
