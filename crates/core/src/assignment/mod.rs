//! Lead assignment engine.
//!
//! Selects the next lead for an idle worker by walking the worker's priority
//! list, claims it atomically and sends a best-effort contact notification.

pub mod candidate;
pub mod strategy;

use std::sync::Arc;

use tracing::{debug, info};

pub use candidate::{CandidateOrder, CandidateQuery, StateFilter};
pub use strategy::{parse_priorities, PriorityStrategy, StrategyPlan, WorkerScope};

use crate::domain::lead::Lead;
use crate::domain::worker::{Worker, WorkerId};
use crate::errors::{ApplicationError, DomainError};
use crate::locks::WorkerLocks;
use crate::notify::notify_best_effort;
use crate::ports::{ContactNotifier, LeadStore, LeadUnitOfWork};

#[derive(Clone)]
pub struct AssignmentEngine {
    store: Arc<dyn LeadStore>,
    notifier: Arc<dyn ContactNotifier>,
    locks: Arc<WorkerLocks>,
}

impl AssignmentEngine {
    pub fn new(
        store: Arc<dyn LeadStore>,
        notifier: Arc<dyn ContactNotifier>,
        locks: Arc<WorkerLocks>,
    ) -> Self {
        Self { store, notifier, locks }
    }

    /// Returns the lead the worker holds, claiming a new one when idle.
    pub async fn assign_next(&self, worker_id: &WorkerId) -> Result<Lead, ApplicationError> {
        let _guard = self.locks.acquire(worker_id).await;
        self.assign_next_locked(worker_id).await
    }

    /// Same as [`AssignmentEngine::assign_next`]; the caller already holds
    /// the worker lock.
    pub(crate) async fn assign_next_locked(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Lead, ApplicationError> {
        let mut unit = self.store.begin().await?;
        let worker = unit
            .lock_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;

        if let Some(held) = worker.current_lead.as_ref() {
            let lead = unit.find_lead(held).await?.ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "worker {worker_id} points at missing lead {held}"
                ))
            })?;
            debug!(
                event_name = "lead.assignment.already_held",
                worker_id = %worker_id,
                lead_id = %lead.id,
                "worker already holds a lead"
            );
            return Ok(lead);
        }

        let groups = unit.groups_for_worker(worker_id).await?;
        if groups.is_empty() {
            return Err(DomainError::NoGroupMembership { worker_id: worker_id.clone() }.into());
        }
        let scope = WorkerScope::new(groups);
        if scope.campaigns.is_empty() {
            return Err(DomainError::NoCampaignsAvailable { worker_id: worker_id.clone() }.into());
        }

        let Some((mut lead, strategy)) = select(&mut *unit, &worker, &scope).await? else {
            unit.set_current_lead(worker_id, None).await?;
            unit.commit().await?;
            info!(
                event_name = "lead.assignment.exhausted",
                worker_id = %worker_id,
                "no lead matched any strategy"
            );
            return Err(DomainError::NoAvailableLead { worker_id: worker_id.clone() }.into());
        };

        unit.set_current_lead(worker_id, Some(&lead.id)).await?;
        unit.commit().await?;

        lead.holder = Some(worker_id.clone());
        info!(
            event_name = "lead.assignment.claimed",
            worker_id = %worker_id,
            lead_id = %lead.id,
            strategy = %strategy,
            "lead assigned"
        );

        let holder = Worker { current_lead: Some(lead.id.clone()), ..worker };
        notify_best_effort(self.notifier.as_ref(), &holder, &lead).await;
        Ok(lead)
    }
}

async fn select(
    unit: &mut dyn LeadUnitOfWork,
    worker: &Worker,
    scope: &WorkerScope,
) -> Result<Option<(Lead, String)>, ApplicationError> {
    for strategy in &parse_priorities(&worker.priorities) {
        let Some(plan) = strategy.plan(scope) else {
            debug!(
                event_name = "lead.assignment.strategy_skipped",
                worker_id = %worker.id,
                strategy = %strategy.tag(),
                "strategy does not apply to worker"
            );
            continue;
        };

        let picked = match plan {
            StrategyPlan::Pool(query) => unit.first_pool_candidate(&query).await?,
            StrategyPlan::OwnQueue => take_queue_head(unit, &worker.id).await?,
        };
        if let Some(lead) = picked {
            return Ok(Some((lead, strategy.tag())));
        }
    }

    Ok(None)
}

/// Pops the worker's queue head. A head whose lead is already held by
/// someone else is not a match and stays queued.
async fn take_queue_head(
    unit: &mut dyn LeadUnitOfWork,
    worker_id: &WorkerId,
) -> Result<Option<Lead>, ApplicationError> {
    let Some(entry) = unit.queue_head(worker_id).await? else {
        return Ok(None);
    };
    let lead = unit
        .find_lead(&entry.lead_id)
        .await?
        .ok_or_else(|| DomainError::LeadNotFound(entry.lead_id.clone()))?;

    if lead.holder.is_some() {
        debug!(
            event_name = "lead.assignment.queue_head_held",
            worker_id = %worker_id,
            lead_id = %lead.id,
            "queued lead is held elsewhere"
        );
        return Ok(None);
    }

    unit.remove_queue_entry(&entry).await?;
    Ok(Some(lead))
}
