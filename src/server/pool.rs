//! Bounded pool for blocking collaborator calls.
//!
//! Embedding, generation and reindex work blocks for a long time. Each job
//! takes a semaphore permit and then runs on tokio's blocking thread pool,
//! so the async workers keep serving unrelated requests and at most
//! `size` jobs run at once.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool is shut down")]
    Closed,

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

#[derive(Clone, Debug)]
pub struct CollaboratorPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl CollaboratorPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the blocking pool once a permit is free.
    pub async fn run<F, T>(&self, job: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| PoolError::TaskFailed(e.to_string()))
    }
}
