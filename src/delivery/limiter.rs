//! Concurrency ceiling for pipeline executions.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Bounds how many transform executions run at once.
///
/// Cache lookups and single-flight waits are never gated; a permit
/// covers one fetch-and-process execution and is released on every exit
/// path. Waiters queue fairly in arrival order and there is no
/// acquisition timeout.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter with an explicit ceiling (clamped to at least 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Create a limiter scaled to the hardware: 2x the logical core count.
    pub fn from_hardware() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores * 2)
    }

    /// Resolve a configured ceiling, where zero means "derive from
    /// hardware".
    pub fn resolve(configured: usize) -> Self {
        let limiter = if configured == 0 {
            Self::from_hardware()
        } else {
            Self::new(configured)
        };
        debug!(limit = limiter.limit(), "concurrency limiter initialized");
        limiter
    }

    /// Wait for a permit. The permit releases its slot on drop.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is never closed, so acquisition cannot fail.
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore closed")
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }

    /// The configured ceiling.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
