//! Entry point wiring the assignment engine, the outcome state machine, the
//! queue and the authorizer over one store and one set of worker locks.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::assignment::AssignmentEngine;
use crate::authorization::{Actor, AuthorizationDecision, LeadAction, LeadAuthorizer};
use crate::config::DispatchConfig;
use crate::domain::lead::{Lead, LeadId, LeadState, NewLead};
use crate::domain::queue::LeadQueueEntry;
use crate::domain::worker::WorkerId;
use crate::errors::{ApplicationError, DomainError};
use crate::locks::WorkerLocks;
use crate::outcome::{OutcomeOptions, OutcomeStateMachine};
use crate::ports::{ContactNotifier, LeadStore};
use crate::queue::LeadQueue;

#[derive(Clone)]
pub struct LeadDispatcher {
    store: Arc<dyn LeadStore>,
    locks: Arc<WorkerLocks>,
    assignment: AssignmentEngine,
    outcomes: OutcomeStateMachine,
    queue: LeadQueue,
    authorizer: LeadAuthorizer,
}

impl LeadDispatcher {
    pub fn new(
        store: Arc<dyn LeadStore>,
        notifier: Arc<dyn ContactNotifier>,
        config: &DispatchConfig,
    ) -> Self {
        let locks = Arc::new(WorkerLocks::default());
        let assignment =
            AssignmentEngine::new(Arc::clone(&store), notifier, Arc::clone(&locks));
        let outcomes = OutcomeStateMachine::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            assignment.clone(),
            config.no_contesta_escalation_threshold,
        );
        let queue = LeadQueue::new(Arc::clone(&store), Arc::clone(&locks));
        let authorizer =
            LeadAuthorizer::new(Arc::clone(&store), config.super_admin_group_id.clone());

        Self { store, locks, assignment, outcomes, queue, authorizer }
    }

    pub async fn assign_next(&self, worker_id: &WorkerId) -> Result<Lead, ApplicationError> {
        self.assignment.assign_next(worker_id).await
    }

    pub async fn type_outcome(
        &self,
        worker_id: &WorkerId,
        outcome: &str,
        observations: &str,
        options: OutcomeOptions,
    ) -> Result<Lead, ApplicationError> {
        self.outcomes.type_outcome(worker_id, outcome, observations, options).await
    }

    pub async fn enqueue(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        self.queue.enqueue(worker_id, lead_id).await
    }

    pub async fn dequeue_first(
        &self,
        worker_id: &WorkerId,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        self.queue.dequeue_first(worker_id).await
    }

    pub async fn list_queue(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<LeadQueueEntry>, ApplicationError> {
        self.queue.list(worker_id).await
    }

    pub async fn can_perform_action(
        &self,
        actor: &Actor,
        lead_id: &LeadId,
        action: LeadAction,
    ) -> Result<AuthorizationDecision, ApplicationError> {
        self.authorizer.can_perform_action(actor, lead_id, action).await
    }

    pub async fn can_assign_to(
        &self,
        actor: &Actor,
        target_id: &WorkerId,
    ) -> Result<AuthorizationDecision, ApplicationError> {
        self.authorizer.can_assign_to(actor, target_id).await
    }

    pub async fn actor_for(&self, worker_id: &WorkerId) -> Result<Actor, ApplicationError> {
        let worker = self
            .store
            .find_worker(worker_id)
            .await?
            .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?;
        Ok(Actor::from(&worker))
    }

    /// Stores a new lead. A phone number already on file marks the lead
    /// `Repetido`; such a lead goes straight to the registering worker when
    /// that worker is idle.
    pub async fn register_lead(
        &self,
        new_lead: NewLead,
        registered_by: Option<&WorkerId>,
    ) -> Result<Lead, ApplicationError> {
        let _guard = match registered_by {
            Some(worker_id) => Some(self.locks.acquire(worker_id).await),
            None => None,
        };
        let mut unit = self.store.begin().await?;

        let registrar = match registered_by {
            Some(worker_id) => Some(
                unit.lock_worker(worker_id)
                    .await?
                    .ok_or_else(|| DomainError::WorkerNotFound(worker_id.clone()))?,
            ),
            None => None,
        };

        let external_id = new_lead.external_id.trim().to_string();
        if unit.find_lead_by_external_id(&external_id).await?.is_some() {
            return Err(DomainError::DuplicateExternalId(external_id).into());
        }

        let phone = new_lead
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string);
        let repeated = match phone.as_deref() {
            Some(phone) => unit.phone_in_use(phone).await?,
            None => false,
        };

        let now = Utc::now();
        let mut lead = Lead {
            id: LeadId(Uuid::new_v4().to_string()),
            external_id,
            full_name: new_lead.full_name,
            phone,
            email: new_lead.email,
            state: repeated.then_some(LeadState::Repetido),
            shift: None,
            campaign_id: new_lead.campaign_id,
            holder: None,
            created_at: now,
            updated_at: now,
        };
        unit.insert_lead(&lead).await?;

        if let Some(worker) = registrar.filter(|worker| repeated && worker.is_idle()) {
            unit.set_current_lead(&worker.id, Some(&lead.id)).await?;
            lead.holder = Some(worker.id);
        }
        unit.commit().await?;

        info!(
            event_name = "lead.registered",
            lead_id = %lead.id,
            external_id = %lead.external_id,
            repeated,
            holder = lead.holder.as_ref().map(|holder| holder.0.as_str()).unwrap_or(""),
            "lead registered"
        );
        Ok(lead)
    }
}
