//! Delivery contexts for subscriber callbacks
//!
//! The queue never runs subscriber callbacks on its own bookkeeping task.
//! Final outcomes are handed to a [`Delivery`] as boxed jobs, so slow or
//! reentrant subscriber code cannot stall scheduling.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tracing::{debug, error};

/// A deferred unit of callback work
pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// An execution context accepting callback jobs
pub trait Delivery: Send + Sync + 'static {
    fn deliver(&self, job: DeliveryJob);
}

/// Runs every job on one dedicated task, one at a time, in submission order
///
/// This is the default context: all callbacks of a queue observe a single,
/// ordered stream of deliveries. Jobs should not block.
pub struct SerialDelivery {
    tx: mpsc::UnboundedSender<DeliveryJob>,
}

impl SerialDelivery {
    /// Spawn the delivery task on the current tokio runtime
    pub fn spawn() -> Self {
        debug!("SerialDelivery::spawn: called");
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(delivery_loop(rx));
        Self { tx }
    }
}

impl Delivery for SerialDelivery {
    fn deliver(&self, job: DeliveryJob) {
        if self.tx.send(job).is_err() {
            error!("SerialDelivery::deliver: delivery task stopped, dropping job");
        }
    }
}

async fn delivery_loop(mut rx: mpsc::UnboundedReceiver<DeliveryJob>) {
    debug!("delivery_loop: started");
    while let Some(job) = rx.recv().await {
        run_job(job);
    }
    debug!("delivery_loop: all senders dropped, exiting");
}

/// Spawns a separate tokio task per job; jobs may run concurrently and out of order
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnDelivery;

impl Delivery for SpawnDelivery {
    fn deliver(&self, job: DeliveryJob) {
        tokio::spawn(async move { run_job(job) });
    }
}

/// Run a job, containing any panic so the context survives it
pub(crate) fn run_job(job: DeliveryJob) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("run_job: subscriber callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serial_delivery_preserves_order() {
        let delivery = SerialDelivery::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = seen.clone();
            delivery.deliver(Box::new(move || seen.lock().unwrap().push(i)));
        }

        let (done_tx, done_rx) = oneshot::channel();
        delivery.deliver(Box::new(move || {
            let _ = done_tx.send(());
        }));
        tokio::time::timeout(Duration::from_secs(5), done_rx).await.unwrap().unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_serial_delivery_survives_panicking_job() {
        let delivery = SerialDelivery::spawn();
        delivery.deliver(Box::new(|| panic!("subscriber bug")));

        let (done_tx, done_rx) = oneshot::channel();
        delivery.deliver(Box::new(move || {
            let _ = done_tx.send(42);
        }));

        let value = tokio::time::timeout(Duration::from_secs(5), done_rx).await.unwrap().unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_spawn_delivery_runs_job() {
        let (done_tx, done_rx) = oneshot::channel();
        SpawnDelivery.deliver(Box::new(move || {
            let _ = done_tx.send("ran");
        }));

        let value = tokio::time::timeout(Duration::from_secs(5), done_rx).await.unwrap().unwrap();
        assert_eq!(value, "ran");
    }
}
