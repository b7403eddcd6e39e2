use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::worker::WorkerId;

const PRUNE_THRESHOLD: usize = 1024;

/// Exclusive async lock per worker id. Every mutating operation takes the
/// lock of the worker it acts for before opening a unit of work.
#[derive(Debug, Default)]
pub struct WorkerLocks {
    slots: Mutex<HashMap<WorkerId, Arc<AsyncMutex<()>>>>,
}

impl WorkerLocks {
    pub async fn acquire(&self, worker_id: &WorkerId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            if slots.len() >= PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(slots.entry(worker_id.clone()).or_default())
        };

        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::WorkerLocks;
    use crate::domain::worker::WorkerId;

    #[tokio::test]
    async fn same_worker_is_serialized() {
        let locks = Arc::new(WorkerLocks::default());
        let worker = WorkerId("W-1".to_string());

        let guard = locks.acquire(&worker).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let worker = worker.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&worker).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished(), "second acquire must wait for the first guard");

        drop(guard);
        contender.await.expect("contender completes once the guard is released");
    }

    #[tokio::test]
    async fn different_workers_do_not_block_each_other() {
        let locks = WorkerLocks::default();
        let _first = locks.acquire(&WorkerId("W-1".to_string())).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&WorkerId("W-2".to_string())),
        )
        .await;

        assert!(second.is_ok());
    }
}
