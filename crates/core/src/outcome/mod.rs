//! Lead outcome state machine.
//!
//! Typing an outcome records an audit row, moves the held lead to its new
//! disposition, runs any follow-up (queue hand-off or scheduled callback) and
//! releases the worker.

pub mod transition;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

pub use transition::{FollowUp, LeadOutcome, LeadTransition, OutcomeOptions};

use crate::assignment::AssignmentEngine;
use crate::domain::lead::Lead;
use crate::domain::lead_log::LeadLog;
use crate::domain::schedule::ScheduledCall;
use crate::domain::worker::WorkerId;
use crate::errors::{ApplicationError, DomainError};
use crate::locks::WorkerLocks;
use crate::ports::LeadStore;

#[derive(Clone)]
pub struct OutcomeStateMachine {
    store: Arc<dyn LeadStore>,
    locks: Arc<WorkerLocks>,
    assignment: AssignmentEngine,
    escalation_threshold: u32,
}

impl OutcomeStateMachine {
    pub fn new(
        store: Arc<dyn LeadStore>,
        locks: Arc<WorkerLocks>,
        assignment: AssignmentEngine,
        escalation_threshold: u32,
    ) -> Self {
        Self { store, locks, assignment, escalation_threshold }
    }

    /// Applies `outcome` to the lead the worker holds. An idle worker gets
    /// the next lead instead.
    ///
    /// Rejected outcomes (missing options or an unknown tag) still keep their
    /// audit row and leave the lead with the worker.
    pub async fn type_outcome(
        &self,
        worker_id: &WorkerId,
        outcome: &str,
        observations: &str,
        options: OutcomeOptions,
    ) -> Result<Lead, ApplicationError> {
        let _guard = self.locks.acquire(worker_id).await;
        let mut unit = self.store.begin().await?;
        let worker = unit
            .lock_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;

        let Some(lead_id) = worker.current_lead else {
            drop(unit);
            debug!(
                event_name = "lead.outcome.delegated",
                worker_id = %worker_id,
                "worker holds no lead; assigning instead"
            );
            return self.assignment.assign_next_locked(worker_id).await;
        };

        let now = Utc::now();
        let prior_attempts = unit.count_logs(&lead_id).await?;
        unit.append_log(&LeadLog::record(
            worker_id.clone(),
            lead_id.clone(),
            outcome,
            observations,
            now,
        ))
        .await?;

        let transition = LeadOutcome::parse(outcome)
            .ok_or_else(|| DomainError::UnhandledOutcome { outcome: outcome.to_string() })
            .and_then(|parsed| {
                parsed.transition(&options, prior_attempts, self.escalation_threshold)
            });
        let transition = match transition {
            Ok(transition) => transition,
            Err(error) => {
                unit.commit().await?;
                warn!(
                    event_name = "lead.outcome.rejected",
                    worker_id = %worker_id,
                    lead_id = %lead_id,
                    outcome = %outcome,
                    error_code = error.code(),
                    "outcome rejected; audit row kept"
                );
                return Err(error.into());
            }
        };

        match &transition.follow_up {
            Some(FollowUp::Enqueue { target }) => {
                if unit.find_worker(target).await?.is_none() {
                    return Err(DomainError::WorkerNotFound(target.clone()).into());
                }
                unit.push_queue_entry(target, &lead_id, now).await?;
            }
            Some(FollowUp::ScheduleCall { subject, starts_at, notes }) => {
                let call = ScheduledCall::new(
                    worker_id.clone(),
                    lead_id.clone(),
                    subject.clone(),
                    *starts_at,
                    notes.clone(),
                    now,
                );
                unit.insert_scheduled_call(&call).await?;
            }
            None => {}
        }

        unit.update_disposition(&lead_id, transition.state, transition.shift, now).await?;
        unit.set_current_lead(worker_id, None).await?;
        let lead = unit.find_lead(&lead_id).await?.ok_or_else(|| {
            DomainError::InvariantViolation(format!("held lead {lead_id} vanished while typing"))
        })?;
        unit.commit().await?;

        info!(
            event_name = "lead.outcome.applied",
            worker_id = %worker_id,
            lead_id = %lead.id,
            outcome = %outcome,
            state = lead.state.map(|state| state.as_str()).unwrap_or("unset"),
            prior_attempts,
            "outcome applied"
        );
        Ok(lead)
    }
}
