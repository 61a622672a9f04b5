//! Singleflight for cache stampede protection
//!
//! Wraps the `async_singleflight` crate so that concurrent cache misses on
//! one key collapse into a single upstream resolution. Followers receive a
//! clone of the leader's result, success or failure.

use std::sync::Arc;

/// Error type for SingleFlight operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFlightError<E> {
    /// The leader was dropped or panicked
    #[error("SingleFlight leader dropped or panicked")]
    LeaderFailed,
    /// The underlying resolution failed
    #[error("{0}")]
    Inner(E),
}

/// Per-cache-key de-duplication of in-flight work.
#[derive(Clone)]
pub struct SingleFlight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    group: Arc<async_singleflight::Group<String, V, E>>,
}

impl<V, E> SingleFlight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            group: Arc::new(async_singleflight::Group::new()),
        }
    }

    /// Run `f` unless a call for `key` is already in flight, in which case
    /// wait for and share that call's result.
    pub async fn do_work<Fut>(&self, key: &str, f: Fut) -> Result<V, SingleFlightError<E>>
    where
        Fut: std::future::Future<Output = Result<V, E>> + Send,
    {
        // Group::work: Err(None) means the leader never produced a result.
        self.group
            .work(&key.to_string(), f)
            .await
            .map_err(|err| err.map_or(SingleFlightError::LeaderFailed, SingleFlightError::Inner))
    }

    /// Like [`Self::do_work`], mapping a failed leader to `E` via `on_leader_failure`.
    pub async fn run<Fut, F>(&self, key: &str, f: Fut, on_leader_failure: F) -> Result<V, E>
    where
        Fut: std::future::Future<Output = Result<V, E>> + Send,
        F: FnOnce() -> E,
    {
        self.do_work(key, f).await.map_err(|e| match e {
            SingleFlightError::LeaderFailed => on_leader_failure(),
            SingleFlightError::Inner(err) => err,
        })
    }
}

impl<V, E> Default for SingleFlight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
