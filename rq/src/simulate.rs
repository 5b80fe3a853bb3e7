//! Synthetic workload for exercising a queue end to end
//!
//! Every key gets several concurrent subscribers; the operation sleeps for a
//! random latency and fails with a configurable probability.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use eyre::{Result, eyre};
use futures::future::join_all;
use rand::Rng;
use recencycache::{Cache, CacheConfig, LruCache};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::operation::Outcome;
use crate::queue::{QueueConfig, QueueError, QueueStats, RequestQueue};

/// Workload shape for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Distinct keys requested
    pub keys: usize,

    /// Concurrent subscribers per key
    #[serde(rename = "subscribers-per-key")]
    pub subscribers_per_key: usize,

    /// Probability that one attempt fails, 0.0 to 1.0
    #[serde(rename = "failure-rate")]
    pub failure_rate: f64,

    /// Upper bound of the random per-attempt latency in milliseconds
    #[serde(rename = "latency-ms")]
    pub latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            keys: 20,
            subscribers_per_key: 3,
            failure_rate: 0.2,
            latency_ms: 25,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(eyre!("failure-rate must be between 0.0 and 1.0, got {}", self.failure_rate));
        }
        if self.subscribers_per_key == 0 {
            return Err(eyre!("subscribers-per-key must be at least 1"));
        }
        Ok(())
    }
}

/// What a simulation run observed
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub keys: usize,
    pub subscribers: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub invocations: u64,
    pub cached: usize,
    pub elapsed_ms: u64,
    pub stats: QueueStats,
}

/// Drive `simulation` through a queue built from `queue` and `cache`
pub async fn run_simulation(
    queue: &QueueConfig,
    cache: Option<CacheConfig>,
    simulation: &SimulationConfig,
) -> Result<SimulationReport> {
    debug!(?queue, ?cache, ?simulation, "run_simulation: called");
    simulation.validate()?;

    let invocations = Arc::new(AtomicU64::new(0));
    let failure_rate = simulation.failure_rate;
    let latency_ms = simulation.latency_ms;

    let counter = invocations.clone();
    let operation = move |key: String| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::Relaxed);
            let (fail, delay) = {
                let mut rng = rand::rng();
                (rng.random_bool(failure_rate), rng.random_range(0..=latency_ms))
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if fail {
                Outcome::failure(format!("synthetic failure for {key}"))
            } else {
                Outcome::success(format!("payload for {key}"))
            }
        }
    };

    let store: Option<Arc<LruCache<String, String>>> = cache.map(|config| Arc::new(LruCache::new(config)));
    let mut builder = RequestQueue::builder(operation).config(queue.clone());
    if let Some(store) = &store {
        builder = builder.cache(store.clone());
    }
    let rq = builder.spawn()?;

    let started = Instant::now();
    let requests = (0..simulation.keys).flat_map(|i| {
        let rq = rq.clone();
        (0..simulation.subscribers_per_key).map(move |_| {
            let rq = rq.clone();
            tokio::spawn(async move { rq.fetch(format!("resource-{i}")).await })
        })
    });
    let results = join_all(requests).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut succeeded = 0;
    let mut failed = 0;
    for result in results {
        let outcome: Result<Outcome<String, String>, QueueError> = result?;
        if outcome?.is_failure() {
            failed += 1;
        } else {
            succeeded += 1;
        }
    }

    let stats = rq.stats().await?;
    rq.shutdown().await?;

    let report = SimulationReport {
        keys: simulation.keys,
        subscribers: simulation.keys * simulation.subscribers_per_key,
        succeeded,
        failed,
        invocations: invocations.load(Ordering::Relaxed),
        cached: store.as_ref().map_or(0, |store| store.len()),
        elapsed_ms,
        stats,
    };
    info!(?report, "Simulation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_failure_rate() {
        let config = SimulationConfig {
            failure_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_simulation_without_failures() {
        let simulation = SimulationConfig {
            keys: 5,
            subscribers_per_key: 4,
            failure_rate: 0.0,
            latency_ms: 2,
        };
        let queue = QueueConfig {
            concurrency_limit: 2,
            ..Default::default()
        };

        let report = run_simulation(&queue, Some(CacheConfig::unbounded()), &simulation)
            .await
            .unwrap();

        assert_eq!(report.subscribers, 20);
        assert_eq!(report.succeeded, 20);
        assert_eq!(report.failed, 0);
        assert_eq!(report.cached, 5);
        assert!(report.invocations >= 5);
        assert!(report.stats.peak_running <= 2);
    }

    #[tokio::test]
    async fn test_simulation_always_failing_exhausts_retries() {
        let simulation = SimulationConfig {
            keys: 3,
            subscribers_per_key: 2,
            failure_rate: 1.0,
            latency_ms: 0,
        };
        let queue = QueueConfig {
            concurrency_limit: 3,
            max_retry_times: 2,
            ..Default::default()
        };

        let report = run_simulation(&queue, None, &simulation).await.unwrap();

        assert_eq!(report.failed, 6);
        assert_eq!(report.cached, 0);
        // a subscriber arriving after delivery starts a fresh round of attempts
        assert!(report.stats.retried >= 6);
        assert_eq!(report.stats.retried % 2, 0);
    }
}
