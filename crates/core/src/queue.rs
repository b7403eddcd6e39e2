//! Per-worker ordered lead queue.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::lead::LeadId;
use crate::domain::queue::LeadQueueEntry;
use crate::domain::worker::WorkerId;
use crate::errors::{ApplicationError, DomainError};
use crate::locks::WorkerLocks;
use crate::ports::LeadStore;

/// Positions stay dense (`1..=N`) per worker across every operation.
#[derive(Clone)]
pub struct LeadQueue {
    store: Arc<dyn LeadStore>,
    locks: Arc<WorkerLocks>,
}

impl LeadQueue {
    pub fn new(store: Arc<dyn LeadStore>, locks: Arc<WorkerLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn enqueue(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        let _guard = self.locks.acquire(worker_id).await;
        let mut unit = self.store.begin().await?;
        unit.lock_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;
        unit.find_lead(lead_id).await?.ok_or_else(|| DomainError::LeadNotFound(lead_id.clone()))?;

        let entry = unit.push_queue_entry(worker_id, lead_id, Utc::now()).await?;
        unit.commit().await?;

        info!(
            event_name = "lead.queue.enqueued",
            worker_id = %worker_id,
            lead_id = %lead_id,
            position = entry.position,
            "lead queued"
        );
        Ok(entry)
    }

    /// Removes and returns the lowest-position entry.
    pub async fn dequeue_first(
        &self,
        worker_id: &WorkerId,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        let _guard = self.locks.acquire(worker_id).await;
        let mut unit = self.store.begin().await?;
        unit.lock_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;

        let entry = unit
            .queue_head(worker_id)
            .await?
            .ok_or_else(|| DomainError::EmptyQueue { worker_id: worker_id.clone() })?;
        unit.remove_queue_entry(&entry).await?;
        unit.commit().await?;

        info!(
            event_name = "lead.queue.dequeued",
            worker_id = %worker_id,
            lead_id = %entry.lead_id,
            "queue head removed"
        );
        Ok(entry)
    }

    pub async fn list(&self, worker_id: &WorkerId) -> Result<Vec<LeadQueueEntry>, ApplicationError> {
        self.store
            .find_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;
        self.store.list_queue(worker_id).await
    }
}
