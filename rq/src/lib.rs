//! RequestQueue - coalescing request queue
//!
//! Runs keyed asynchronous operations on behalf of many subscribers. At most
//! one operation is in flight per key; every subscriber that asked for that
//! key while it was tracked receives the same outcome.
//!
//! # Core Concepts
//!
//! - **Coalescing**: concurrent requests for one key share a single operation
//! - **Bounded concurrency**: at most `concurrency-limit` operations run at once
//! - **Retries**: failed attempts go to the back of the line up to `max-retry-times`
//! - **Result cache**: successful values are written to an optional [`Cache`]
//!
//! # Modules
//!
//! - [`queue`] - Queue actor, client handle and builder
//! - [`operation`] - Outcome type and the operation trait
//! - [`delivery`] - Where subscriber callbacks run
//! - [`simulate`] - Synthetic workloads for the `rq` binary
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod delivery;
pub mod operation;
pub mod queue;
pub mod simulate;

// Re-export commonly used types
pub use config::Config;
pub use delivery::{Delivery, DeliveryJob, SerialDelivery, SpawnDelivery};
pub use operation::{Operation, Outcome};
pub use queue::{
    QueueBuilder, QueueConfig, QueueError, QueueKey, QueueResult, QueueState, QueueStats, RequestQueue, Subscriber,
};
pub use recencycache::{Cache, CacheConfig, LruCache, NoopCache};
pub use simulate::{SimulationConfig, SimulationReport, run_simulation};
