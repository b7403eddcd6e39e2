use leadflow_core::domain::lead::LeadId;
use leadflow_core::domain::worker::WorkerId;

use crate::commands::{operation_failure, run_with_dispatcher, to_data, CommandResult};

pub fn enqueue(worker: &str, lead: &str) -> CommandResult {
    let worker_id = WorkerId(worker.trim().to_string());
    let lead_id = LeadId(lead.trim().to_string());
    run_with_dispatcher("enqueue", |dispatcher| async move {
        let entry = dispatcher.enqueue(&worker_id, &lead_id).await.map_err(operation_failure)?;
        let message =
            format!("lead {lead_id} queued for worker {worker_id} at position {}", entry.position);
        Ok((message, to_data(&entry)?))
    })
}

pub fn dequeue(worker: &str) -> CommandResult {
    let worker_id = WorkerId(worker.trim().to_string());
    run_with_dispatcher("dequeue", |dispatcher| async move {
        let entry = dispatcher.dequeue_first(&worker_id).await.map_err(operation_failure)?;
        let message = format!("removed lead {} from the queue of worker {worker_id}", entry.lead_id);
        Ok((message, to_data(&entry)?))
    })
}

pub fn list(worker: &str) -> CommandResult {
    let worker_id = WorkerId(worker.trim().to_string());
    run_with_dispatcher("queue", |dispatcher| async move {
        let entries = dispatcher.list_queue(&worker_id).await.map_err(operation_failure)?;
        let message = format!("worker {worker_id} has {} queued leads", entries.len());
        Ok((message, to_data(&entries)?))
    })
}
