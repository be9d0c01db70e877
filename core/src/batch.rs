//! Per-item results of sequential batch mutations
//!
//! Batched writes (record position updates, column layout updates) are
//! issued one at a time and stop at the first failure. There is no rollback:
//! the outcome records exactly which items reached the backend.

use std::future::Future;

use log::{debug, error};

use crate::error::ApiError;

/// Failure of one item in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Item identifier
    pub id: i64,

    /// Error returned for the item
    pub error: ApiError,
}

/// Result of a sequential batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Items persisted, in the order they were sent
    pub succeeded: Vec<i64>,

    /// Item that failed; the batch stops there so this holds at most one entry
    pub failed: Vec<BatchFailure>,

    /// Items never sent because an earlier item failed
    pub not_attempted: Vec<i64>,
}

impl BatchOutcome {
    /// Whether every item was persisted
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty()
    }

    /// First failure, if any
    pub fn first_failure(&self) -> Option<&BatchFailure> {
        self.failed.first()
    }
}

/// Run `op` for every item in order, awaiting each call before the next
///
/// Calls are never issued in parallel. The first error stops the batch.
pub async fn run_sequential<T, F, Fut>(items: Vec<(i64, T)>, mut op: F) -> BatchOutcome
where
    F: FnMut(i64, T) -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    let mut outcome = BatchOutcome::default();
    let mut items = items.into_iter();

    while let Some((id, item)) = items.next() {
        match op(id, item).await {
            Ok(()) => {
                debug!("Batch item {} persisted", id);
                outcome.succeeded.push(id);
            }
            Err(e) => {
                error!("Batch item {} failed: {}", id, e);
                outcome.failed.push(BatchFailure { id, error: e });
                outcome.not_attempted = items.by_ref().map(|(id, _)| id).collect();
                break;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_all_items_succeed() {
        let outcome = run_sequential(vec![(1, ()), (2, ()), (3, ())], |_, _| async { Ok(()) }).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let calls = Mutex::new(Vec::new());

        let outcome = run_sequential(vec![(1, ()), (2, ()), (3, ()), (4, ())], |id, _| {
            calls.lock().unwrap().push(id);
            async move {
                if id == 2 {
                    Err(ApiError::Network("reset".into()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
        assert_eq!(outcome.succeeded, vec![1]);
        assert_eq!(outcome.first_failure().map(|f| f.id), Some(2));
        assert_eq!(outcome.not_attempted, vec![3, 4]);
        assert!(!outcome.is_complete());
    }
}
