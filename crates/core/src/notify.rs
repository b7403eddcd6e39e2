use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use crate::domain::lead::{Lead, LeadId};
use crate::domain::worker::{Worker, WorkerId};
use crate::errors::ApplicationError;
use crate::ports::ContactNotifier;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopContactNotifier;

#[async_trait]
impl ContactNotifier for NoopContactNotifier {
    async fn lead_assigned(&self, _worker: &Worker, _lead: &Lead) -> Result<(), ApplicationError> {
        Ok(())
    }
}

/// Keeps every notification in memory; optionally fails each call so callers
/// can check that delivery problems never leak into the main flow.
#[derive(Clone, Default)]
pub struct RecordingContactNotifier {
    sent: Arc<Mutex<Vec<(WorkerId, LeadId)>>>,
    fail: bool,
}

impl RecordingContactNotifier {
    pub fn failing() -> Self {
        Self { sent: Arc::default(), fail: true }
    }

    pub fn sent(&self) -> Vec<(WorkerId, LeadId)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ContactNotifier for RecordingContactNotifier {
    async fn lead_assigned(&self, worker: &Worker, lead: &Lead) -> Result<(), ApplicationError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push((worker.id.clone(), lead.id.clone())),
            Err(poisoned) => poisoned.into_inner().push((worker.id.clone(), lead.id.clone())),
        }
        if self.fail {
            return Err(ApplicationError::Integration("notifier unreachable".to_string()));
        }
        Ok(())
    }
}

/// Delivers the assignment notice and swallows any failure after logging it.
pub async fn notify_best_effort(notifier: &dyn ContactNotifier, worker: &Worker, lead: &Lead) {
    if let Err(error) = notifier.lead_assigned(worker, lead).await {
        warn!(
            event_name = "lead.notify.failed",
            worker_id = %worker.id,
            lead_id = %lead.id,
            error = %error,
            "contact notification failed; assignment kept"
        );
    }
}
