//! Message types for the queue actor

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::operation::Outcome;

/// Errors from queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("Request was dropped before an outcome was delivered")]
    Discarded,

    #[error("Queue channel closed")]
    ChannelError,
}

/// Response from queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Callback invoked once with the final outcome of its key
pub type Subscriber<K, V, E> = Box<dyn FnOnce(&K, &Outcome<V, E>) + Send + 'static>;

/// Snapshot of the queue's bookkeeping
#[derive(Debug, Clone)]
pub struct QueueState<K> {
    /// Keys waiting for a slot, head first
    pub pending: Vec<K>,

    /// Keys whose operation is in flight
    pub running: Vec<K>,

    /// Keys with at least one subscriber
    pub tracked: usize,

    /// Subscribers across all keys
    pub subscribers: usize,

    /// Failed attempts so far, per key
    pub retries: HashMap<K, u32>,
}

/// Counters for the queue
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Subscribers added
    pub submitted: u64,
    /// Subscribers that joined a key already tracked
    pub coalesced: u64,
    /// Operation attempts started
    pub started: u64,
    /// Attempts re-queued after failing
    pub retried: u64,
    /// Keys whose final outcome was delivered
    pub delivered: u64,
    /// Outcomes dropped because their key had no subscribers left
    pub discarded: u64,
    /// Keys cancelled while pending or running
    pub cancelled: u64,
    /// Attempts whose operation panicked
    pub abandoned: u64,
    /// Completions from attempts that were aborted or superseded
    pub stale: u64,
    /// Highest number of simultaneously running operations
    pub peak_running: usize,
}

/// Commands processed by the queue actor, strictly in arrival order
pub(crate) enum QueueCommand<K, V, E> {
    Add {
        key: K,
        subscriber: Subscriber<K, V, E>,
    },
    Remove {
        key: K,
    },
    RemoveAll,
    Cancel {
        key: K,
        reply: oneshot::Sender<bool>,
    },

    /// An operation attempt resolved
    Completed {
        key: K,
        attempt: u64,
        outcome: Outcome<V, E>,
    },

    /// An operation attempt panicked
    Panicked {
        key: K,
        attempt: u64,
    },

    GetState {
        reply: oneshot::Sender<QueueState<K>>,
    },
    GetStats {
        reply: oneshot::Sender<QueueStats>,
    },

    Shutdown,
}
