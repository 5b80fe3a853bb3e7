//! Operation capability - the unit of work the queue schedules
//!
//! An operation turns a key into a future that resolves to an [`Outcome`]. The
//! queue spawns that future on the tokio runtime and waits for it; nothing else
//! about the work is visible to the scheduler.
//!
//! # Contract
//!
//! The returned future must resolve exactly once. A future that never resolves
//! keeps its concurrency slot forever; the queue does not time operations out.

use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;

/// Result of one operation attempt
///
/// Value and error are independent. The queue caches whenever a value is
/// present and retries whenever an error is present, so an attempt that
/// reports both is cached and retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<V, E> {
    pub value: Option<V>,
    pub error: Option<E>,
}

impl<V, E> Outcome<V, E> {
    pub fn new(value: Option<V>, error: Option<E>) -> Self {
        Self { value, error }
    }

    /// A successful attempt carrying a value
    pub fn success(value: V) -> Self {
        Self::new(Some(value), None)
    }

    /// A failed attempt
    pub fn failure(error: E) -> Self {
        Self::new(None, Some(error))
    }

    /// Neither value nor error
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Error wins over value when both are present
    pub fn into_result(self) -> Result<Option<V>, E> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

impl<V, E> From<Result<V, E>> for Outcome<V, E> {
    fn from(result: Result<V, E>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(error),
        }
    }
}

/// Executes the work behind a key
///
/// Implemented for any `Fn(K) -> impl Future<Output = Outcome<V, E>>`, so a
/// closure returning an async block is usually all that's needed.
pub trait Operation<K, V, E>: Send + Sync + 'static {
    fn execute(&self, key: K) -> BoxFuture<'static, Outcome<V, E>>;
}

impl<K, V, E, F, Fut> Operation<K, V, E> for F
where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<V, E>> + Send + 'static,
{
    fn execute(&self, key: K) -> BoxFuture<'static, Outcome<V, E>> {
        (self)(key).boxed()
    }
}
