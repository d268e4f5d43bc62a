//! In-memory result cache with single-flight computation.
//!
//! Completed transform outputs are kept under a byte budget and evicted
//! oldest-inserted-first. Concurrent requests for the same cache key
//! share one computation: the first arrival becomes the leader and runs
//! the pipeline, later arrivals wait for its result. Failures propagate
//! to every waiter and are never cached, so the next request retries.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::DeliverError;
use crate::pipeline::ProcessedImage;
use crate::transform::CacheKey;

/// Shared state for one in-flight computation.
struct InFlight {
    notify: Notify,
    result: Mutex<Option<Result<ProcessedImage, DeliverError>>>,
}

struct Inner {
    map: HashMap<CacheKey, ProcessedImage>,
    order: VecDeque<CacheKey>,
    total_bytes: i64,
}

impl Inner {
    /// Insert an entry and evict oldest entries while over budget.
    fn insert(&mut self, key: CacheKey, image: ProcessedImage, budget: i64) {
        let size = image.len() as i64;

        if let Some(old) = self.map.insert(key.clone(), image) {
            self.total_bytes -= old.len() as i64;
        }
        self.total_bytes += size;
        self.order.push_back(key);

        while self.total_bytes > budget {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            // Re-inserted keys leave stale order entries behind; those
            // no longer resolve in the map and are skipped.
            if let Some(evicted) = self.map.remove(&oldest) {
                self.total_bytes -= evicted.len() as i64;
                debug!(bytes = evicted.len(), "evicted cached result");
            }
        }
    }
}

/// Byte-budgeted cache of encoded transform results.
pub struct ResultCache {
    /// Budget in bytes; zero or negative disables caching entirely.
    budget: i64,
    inner: Arc<Mutex<Inner>>,
    in_flight: Arc<Mutex<HashMap<CacheKey, Arc<InFlight>>>>,
}

impl ResultCache {
    pub fn new(budget_bytes: i64) -> Self {
        Self {
            budget: budget_bytes,
            inner: Arc::new(Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                total_bytes: 0,
            })),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether results are retained at all.
    pub fn enabled(&self) -> bool {
        self.budget > 0
    }

    /// Look up a cached result without computing.
    pub async fn get(&self, key: &CacheKey) -> Option<ProcessedImage> {
        if !self.enabled() {
            return None;
        }
        self.inner.lock().await.map.get(key).cloned()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.map.is_empty()
    }

    /// Total bytes currently held.
    pub async fn total_bytes(&self) -> i64 {
        self.inner.lock().await.total_bytes
    }

    /// Insert a result directly, evicting oldest entries while over
    /// budget.
    pub async fn insert(&self, key: CacheKey, image: ProcessedImage) {
        if !self.enabled() {
            return;
        }
        self.inner.lock().await.insert(key, image, self.budget);
    }

    /// Return the cached result for `key`, or compute it.
    ///
    /// The boolean is true when the result came straight from the cache.
    /// The computation runs on a detached task, so a caller that
    /// disconnects mid-flight does not abort work other waiters share.
    /// With caching disabled every call runs its own computation; no
    /// state is kept and concurrent requests do not share work.
    pub async fn get_or_compute<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> (Result<ProcessedImage, DeliverError>, bool)
    where
        F: Future<Output = Result<ProcessedImage, DeliverError>> + Send + 'static,
    {
        if !self.enabled() {
            return (compute.await, false);
        }

        if let Some(cached) = self.get(&key).await {
            return (Ok(cached), true);
        }

        let state = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let state = Arc::new(InFlight {
                        notify: Notify::new(),
                        result: Mutex::new(None),
                    });
                    in_flight.insert(key.clone(), state.clone());

                    let inner = self.inner.clone();
                    let in_flight_map = self.in_flight.clone();
                    let budget = self.budget;
                    let leader_state = state.clone();
                    let leader_key = key.clone();
                    tokio::spawn(async move {
                        let result = compute.await;

                        if let Ok(image) = &result {
                            inner
                                .lock()
                                .await
                                .insert(leader_key.clone(), image.clone(), budget);
                        }

                        *leader_state.result.lock().await = Some(result);
                        in_flight_map.lock().await.remove(&leader_key);
                        leader_state.notify.notify_waiters();
                    });

                    state
                }
            }
        };

        // Register for the notification before checking the result slot,
        // otherwise a completion between check and await is lost.
        let notified = state.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(result) = state.result.lock().await.clone() {
            return (result, false);
        }

        notified.await;

        let result = state
            .result
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| unreachable!("notified before result was set"));
        (result, false)
    }
}

// =============================================================================
// Tests
// =============================================================================
