//! Request coalescing for identical in-flight operations.
//!
//! When several requests miss the cache for the same short code at once,
//! only one of them should reach the store. [`Coalescer`] tracks in-flight
//! work per key: the first caller becomes the leader and runs the
//! operation, later callers subscribe to its outcome. Once the operation
//! completes the key is released; results are never cached beyond the
//! in-flight window.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::broadcast;

use crate::error::AppError;

type FlightResult<T> = Result<T, AppError>;
type Registry<T> = Mutex<HashMap<String, broadcast::Sender<FlightResult<T>>>>;

/// Merges concurrent identical operations into a single execution.
///
/// The leader's work runs in a spawned task, so cancelling any individual
/// caller (leader included) does not abort the underlying operation for
/// the remaining waiters.
#[derive(Debug)]
pub struct Coalescer<T> {
    inflight: Arc<Registry<T>>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Coalescer<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone + Send + 'static> Coalescer<T> {
    /// Runs `work` under `key`, merging with an in-flight execution if one
    /// exists.
    ///
    /// Returns the shared result and whether this caller piggybacked on
    /// another caller's execution (`true` for everyone except the leader).
    /// If this call merges with an existing flight, `work` is dropped
    /// without being polled.
    pub async fn run<Fut>(&self, key: &str, work: Fut) -> (FlightResult<T>, bool)
    where
        Fut: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let (rx, was_shared) = self.join(key, work);
        (Self::wait(rx).await, was_shared)
    }

    /// Subscribes to the flight for `key`, starting one if none exists.
    fn join<Fut>(&self, key: &str, work: Fut) -> (broadcast::Receiver<FlightResult<T>>, bool)
    where
        Fut: Future<Output = FlightResult<T>> + Send + 'static,
    {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(tx) = inflight.get(key) {
            return (tx.subscribe(), true);
        }

        // Only one message is ever sent per flight.
        let (tx, rx) = broadcast::channel(1);
        inflight.insert(key.to_string(), tx.clone());
        drop(inflight);

        let registry = Arc::clone(&self.inflight);
        let key = key.to_string();
        tokio::spawn(async move {
            let result = work.await;

            registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&key);

            // All waiters may have been cancelled in the meantime.
            let _ = tx.send(result);
        });

        (rx, false)
    }

    async fn wait(mut rx: broadcast::Receiver<FlightResult<T>>) -> FlightResult<T> {
        match rx.recv().await {
            Ok(result) => result,
            Err(_) => Err(AppError::internal(
                "Coalesced operation aborted before completing",
                json!({}),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_execute_work_once() {
        let coalescer = Arc::new(Coalescer::<u64>::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(16));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coalescer = coalescer.clone();
            let executions = executions.clone();
            let barrier = barrier.clone();

            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                coalescer
                    .run("hot-key", async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        let mut leaders = 0;
        for handle in handles {
            let (result, was_shared) = handle.await.unwrap();
            assert_eq!(result.unwrap(), 42);
            if !was_shared {
                leaders += 1;
            }
        }

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
    }

    #[tokio::test]
    async fn test_key_released_after_completion() {
        let coalescer = Coalescer::<u64>::new();
        let executions = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let counter = executions.clone();
            let (result, was_shared) = coalescer
                .run("key", async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;

            assert_eq!(result.unwrap(), 7);
            assert!(!was_shared);
            assert_eq!(executions.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_do_not_merge() {
        let coalescer = Arc::new(Coalescer::<u64>::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));

        let mut handles = Vec::new();
        for key in ["first", "second"] {
            let coalescer = coalescer.clone();
            let executions = executions.clone();
            let barrier = barrier.clone();

            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                coalescer
                    .run(key, async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(1)
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().0.unwrap();
        }
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_error_is_shared_with_all_waiters() {
        let coalescer = Arc::new(Coalescer::<u64>::new());
        let barrier = Arc::new(Barrier::new(4));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coalescer = coalescer.clone();
            let barrier = barrier.clone();

            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                coalescer
                    .run("failing", async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err(AppError::internal("store unavailable", json!({})))
                    })
                    .await
            }));
        }

        for handle in handles {
            let (result, _) = handle.await.unwrap();
            let err = result.unwrap_err();
            assert!(matches!(err, AppError::Internal { .. }));
            assert_eq!(err.message(), "store unavailable");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_leader_cancellation_does_not_abort_work() {
        let coalescer = Arc::new(Coalescer::<u64>::new());
        let barrier = Arc::new(Barrier::new(2));

        let leader = {
            let coalescer = coalescer.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                let fut = coalescer.run("key", async move {
                    barrier.wait().await;
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(99)
                });
                fut.await
            })
        };

        // Wait for the leader's work to start, then cancel the leader.
        barrier.wait().await;
        leader.abort();

        // A follower arriving afterwards still receives the result of the
        // original execution.
        let (result, _) = coalescer.run("key", async { Ok(0) }).await;
        assert_eq!(result.unwrap(), 99);
    }
}
