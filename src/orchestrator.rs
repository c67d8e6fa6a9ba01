//! Fan-out of sibling work behind a bounded gate.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;

use crate::error::MirrorError;

/// Caps the number of remote requests and file syncs in flight at once.
///
/// A permit covers a single operation and is never held while waiting on
/// child traversals, so nested fan-out cannot starve the gate.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    pub fn new(limit: usize) -> Result<Self, MirrorError> {
        if limit == 0 {
            return Err(MirrorError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(limit)),
        })
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run<F, T>(&self, operation: F) -> Result<T, MirrorError>
    where
        F: Future<Output = Result<T, MirrorError>>,
    {
        // The semaphore is owned here and never closed.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| MirrorError::InvalidConfig(err.to_string()))?;
        operation.await
    }
}

/// Runs all branches concurrently and returns their results in input order.
///
/// The first error wins; the remaining branches are dropped at that point,
/// which cancels whatever they still had in flight.
pub async fn fan_out<I, F, T>(branches: I) -> Result<Vec<T>, MirrorError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, MirrorError>>,
{
    try_join_all(branches).await
}
