use leadflow_core::domain::worker::WorkerId;

use crate::commands::{operation_failure, run_with_dispatcher, to_data, CommandResult};

pub fn run(worker: &str) -> CommandResult {
    let worker_id = WorkerId(worker.trim().to_string());
    run_with_dispatcher("assign", |dispatcher| async move {
        let lead = dispatcher.assign_next(&worker_id).await.map_err(operation_failure)?;
        Ok((format!("worker {worker_id} is working lead {}", lead.id), to_data(&lead)?))
    })
}
