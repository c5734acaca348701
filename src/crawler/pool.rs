//! Bounded worker pool
//!
//! This module limits how many page workers are in flight at once. Tasks are
//! handed to the pool in dispatch order; each waits for a free slot before it
//! is spawned on the runtime and releases the slot when it finishes.

use crate::HarvestError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Fixed-size pool of concurrent worker slots
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// One permit per worker slot
    semaphore: Arc<Semaphore>,

    size: usize,
}

impl WorkerPool {
    /// Creates a pool with `size` slots (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a free slot, then spawns `task` holding that slot
    ///
    /// # Returns
    ///
    /// * `Ok(JoinHandle)` - The task was spawned
    /// * `Err(HarvestError)` - The pool was closed
    pub async fn spawn<F>(&self, task: F) -> Result<JoinHandle<F::Output>, HarvestError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::Worker("worker pool is closed".to_string()))?;

        Ok(tokio::spawn(async move {
            let output = task.await;
            drop(permit);
            output
        }))
    }
}
