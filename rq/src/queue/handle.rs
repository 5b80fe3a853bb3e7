//! RequestQueue - client handle to the queue actor

use std::sync::Arc;

use recencycache::Cache;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::delivery::{Delivery, SerialDelivery};
use crate::operation::{Operation, Outcome};

use super::QueueKey;
use super::config::QueueConfig;
use super::core::QueueCore;
use super::messages::{QueueCommand, QueueError, QueueResult, QueueState, QueueStats};

/// Handle to a running request queue
///
/// Cheap to clone; every clone talks to the same actor. The actor stops on
/// [`RequestQueue::shutdown`] or once every handle has been dropped.
pub struct RequestQueue<K, V, E> {
    tx: mpsc::Sender<QueueCommand<K, V, E>>,
}

impl<K, V, E> Clone for RequestQueue<K, V, E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<K, V, E> RequestQueue<K, V, E>
where
    K: QueueKey,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Start configuring a queue around `operation`
    pub fn builder(operation: impl Operation<K, V, E>) -> QueueBuilder<K, V, E> {
        QueueBuilder::new(operation)
    }

    /// Spawn a queue with default configuration, no cache and serial delivery
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(operation: impl Operation<K, V, E>) -> QueueResult<Self> {
        Self::builder(operation).spawn()
    }

    /// Subscribe `callback` to the outcome of `key`
    ///
    /// Concurrent calls for the same key share one operation. The callback runs
    /// exactly once on the delivery context, unless the key is removed,
    /// cancelled or cleared first.
    pub async fn add<F>(&self, key: K, callback: F) -> QueueResult<()>
    where
        F: FnOnce(&K, &Outcome<V, E>) + Send + 'static,
    {
        debug!(?key, "RequestQueue::add: called");
        self.send(QueueCommand::Add {
            key,
            subscriber: Box::new(callback),
        })
        .await
    }

    /// Subscribe to `key` and wait for its outcome
    ///
    /// Resolves to [`QueueError::Discarded`] if the subscription is dropped
    /// before delivery.
    pub async fn fetch(&self, key: K) -> QueueResult<Outcome<V, E>> {
        debug!(?key, "RequestQueue::fetch: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.add(key, move |_key: &K, outcome: &Outcome<V, E>| {
            let _ = reply_tx.send(outcome.clone());
        })
        .await?;
        reply_rx.await.map_err(|_| QueueError::Discarded)
    }

    /// Drop every subscriber of `key`
    ///
    /// A pending key never starts. A running key keeps its slot until its
    /// operation resolves; that outcome is then discarded.
    pub async fn remove(&self, key: K) -> QueueResult<()> {
        debug!(?key, "RequestQueue::remove: called");
        self.send(QueueCommand::Remove { key }).await
    }

    /// Drop every subscriber and abort every in-flight operation
    pub async fn remove_all(&self) -> QueueResult<()> {
        debug!("RequestQueue::remove_all: called");
        self.send(QueueCommand::RemoveAll).await
    }

    /// Drop the subscribers of `key` and abort its operation if running
    ///
    /// Returns false when the key was not tracked.
    pub async fn cancel(&self, key: K) -> QueueResult<bool> {
        debug!(?key, "RequestQueue::cancel: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(QueueCommand::Cancel { key, reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| QueueError::ChannelError)
    }

    /// Snapshot of the current bookkeeping
    pub async fn state(&self) -> QueueResult<QueueState<K>> {
        debug!("RequestQueue::state: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(QueueCommand::GetState { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| QueueError::ChannelError)
    }

    /// Counters since the queue started
    pub async fn stats(&self) -> QueueResult<QueueStats> {
        debug!("RequestQueue::stats: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(QueueCommand::GetStats { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| QueueError::ChannelError)
    }

    /// Stop the actor, aborting in-flight operations
    pub async fn shutdown(&self) -> QueueResult<()> {
        debug!("RequestQueue::shutdown: called");
        self.send(QueueCommand::Shutdown).await
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, cmd: QueueCommand<K, V, E>) -> QueueResult<()> {
        self.tx.send(cmd).await.map_err(|_| QueueError::ChannelError)
    }
}

/// Builder for [`RequestQueue`]
pub struct QueueBuilder<K, V, E> {
    operation: Arc<dyn Operation<K, V, E>>,
    config: QueueConfig,
    cache: Option<Arc<dyn Cache<K, V>>>,
    delivery: Option<Arc<dyn Delivery>>,
}

impl<K, V, E> QueueBuilder<K, V, E>
where
    K: QueueKey,
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(operation: impl Operation<K, V, E>) -> Self {
        Self {
            operation: Arc::new(operation),
            config: QueueConfig::default(),
            cache: None,
            delivery: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.config.concurrency_limit = concurrency_limit;
        self
    }

    pub fn max_retry_times(mut self, max_retry_times: u32) -> Self {
        self.config.max_retry_times = max_retry_times;
        self
    }

    pub fn channel_buffer(mut self, channel_buffer: usize) -> Self {
        self.config.channel_buffer = channel_buffer;
        self
    }

    /// Store successful values in `cache`
    pub fn cache(mut self, cache: Arc<dyn Cache<K, V>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run subscriber callbacks on `delivery` instead of a new [`SerialDelivery`]
    pub fn delivery(mut self, delivery: Arc<dyn Delivery>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Validate the configuration and spawn the actor on the current tokio runtime
    pub fn spawn(self) -> QueueResult<RequestQueue<K, V, E>> {
        debug!(config = ?self.config, "QueueBuilder::spawn: called");
        self.config.validate()?;

        let (tx, rx) = mpsc::channel(self.config.channel_buffer);
        let delivery = self
            .delivery
            .unwrap_or_else(|| Arc::new(SerialDelivery::spawn()) as Arc<dyn Delivery>);

        info!(
            concurrency_limit = self.config.concurrency_limit,
            max_retry_times = self.config.max_retry_times,
            cache = self.cache.is_some(),
            "Request queue spawned"
        );

        let core = QueueCore::new(self.config, self.operation, self.cache, delivery, tx.downgrade());
        tokio::spawn(core.run(rx));

        Ok(RequestQueue { tx })
    }
}
