//! Coalescing request queue
//!
//! Deduplicates concurrent requests for the same key, bounds how many
//! operations run at once, retries failures and fans every final outcome out
//! to all coalesced subscribers.
//!
//! All bookkeeping lives in a single actor task ([`core`]); the cloneable
//! [`RequestQueue`] handle only sends it commands.

mod config;
mod core;
mod handle;
mod messages;

use std::fmt::Debug;
use std::hash::Hash;

pub use config::QueueConfig;
pub use handle::{QueueBuilder, RequestQueue};
pub use messages::{QueueError, QueueResult, QueueState, QueueStats, Subscriber};

/// Bounds required of request keys
pub trait QueueKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> QueueKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}
