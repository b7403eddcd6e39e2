use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use leadflow_core::assignment::CandidateQuery;
use leadflow_core::domain::grant::ShareLeadGrant;
use leadflow_core::domain::group::{Campaign, CampaignId, Group, GroupId};
use leadflow_core::domain::lead::{Lead, LeadDocument, LeadId, LeadState, Shift};
use leadflow_core::domain::lead_log::LeadLog;
use leadflow_core::domain::queue::{compact_after, next_position, LeadQueueEntry, LeadQueueEntryId};
use leadflow_core::domain::schedule::ScheduledCall;
use leadflow_core::domain::worker::{Worker, WorkerId, WorkerLink};
use leadflow_core::errors::{ApplicationError, DomainError};
use leadflow_core::ports::{LeadStore, LeadUnitOfWork};

use super::{LeadSeeder, RepositoryError};

#[derive(Clone, Debug, Default)]
struct State {
    campaigns: BTreeMap<CampaignId, Campaign>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeMap<WorkerId, BTreeSet<GroupId>>,
    workers: BTreeMap<WorkerId, Worker>,
    /// Stored without holder; see [`State::lead`].
    leads: BTreeMap<LeadId, Lead>,
    documents: Vec<LeadDocument>,
    logs: Vec<LeadLog>,
    queues: BTreeMap<WorkerId, Vec<LeadQueueEntry>>,
    calls: Vec<ScheduledCall>,
    grants: Vec<ShareLeadGrant>,
}

impl State {
    fn holder_of(&self, lead_id: &LeadId) -> Option<WorkerId> {
        self.workers
            .values()
            .find(|worker| worker.current_lead.as_ref() == Some(lead_id))
            .map(|worker| worker.id.clone())
    }

    fn lead(&self, lead_id: &LeadId) -> Option<Lead> {
        self.leads.get(lead_id).map(|lead| Lead { holder: self.holder_of(lead_id), ..lead.clone() })
    }

    fn groups_for(&self, worker_id: &WorkerId) -> Vec<Group> {
        self.memberships
            .get(worker_id)
            .into_iter()
            .flatten()
            .filter_map(|group_id| self.groups.get(group_id).cloned())
            .collect()
    }

    fn has_document(&self, lead_id: &LeadId) -> bool {
        self.documents.iter().any(|document| &document.lead_id == lead_id)
    }

    fn queue_head(&self, worker_id: &WorkerId) -> Option<LeadQueueEntry> {
        self.queues
            .get(worker_id)
            .and_then(|entries| entries.iter().min_by_key(|entry| entry.position))
            .cloned()
    }
}

/// Storage port over a single shared snapshot. A unit of work holds the
/// snapshot lock for its whole lifetime and edits a private copy that only
/// replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn begin(&self) -> Result<Box<dyn LeadUnitOfWork>, ApplicationError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryLeadUnit { guard, working }))
    }

    async fn find_worker(&self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.workers.get(id).cloned())
    }

    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.lead(id))
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.groups.get(id).cloned())
    }

    async fn groups_for_worker(&self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.groups_for(id))
    }

    async fn worker_links(&self) -> Result<Vec<WorkerLink>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.workers.values().map(Worker::link).collect())
    }

    async fn list_queue(
        &self,
        worker_id: &WorkerId,
    ) -> Result<Vec<LeadQueueEntry>, ApplicationError> {
        let state = self.state.lock().await;
        let mut entries = state.queues.get(worker_id).cloned().unwrap_or_default();
        entries.sort_by_key(|entry| entry.position);
        Ok(entries)
    }

    async fn has_queue_entry(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state
            .queues
            .get(worker_id)
            .map(|entries| entries.iter().any(|entry| &entry.lead_id == lead_id))
            .unwrap_or(false))
    }

    async fn has_scheduled_call(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.calls.iter().any(|call| &call.worker_id == worker_id && &call.lead_id == lead_id))
    }

    async fn has_share_grant(
        &self,
        grantor: &WorkerId,
        grantee: &WorkerId,
    ) -> Result<bool, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.grants.iter().any(|grant| &grant.grantor == grantor && &grant.grantee == grantee))
    }

    async fn logs_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadLog>, ApplicationError> {
        let state = self.state.lock().await;
        Ok(state.logs.iter().filter(|log| &log.lead_id == lead_id).cloned().collect())
    }
}

pub struct InMemoryLeadUnit {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl LeadUnitOfWork for InMemoryLeadUnit {
    async fn lock_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        Ok(self.working.workers.get(id).cloned())
    }

    async fn find_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError> {
        Ok(self.working.workers.get(id).cloned())
    }

    async fn find_lead(&mut self, id: &LeadId) -> Result<Option<Lead>, ApplicationError> {
        Ok(self.working.lead(id))
    }

    async fn groups_for_worker(&mut self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError> {
        Ok(self.working.groups_for(id))
    }

    async fn first_pool_candidate(
        &mut self,
        query: &CandidateQuery,
    ) -> Result<Option<Lead>, ApplicationError> {
        let state = &self.working;
        let leads: Vec<Lead> = state.leads.keys().filter_map(|id| state.lead(id)).collect();
        let picked = query.pick(leads.iter().map(|lead| (lead, state.has_document(&lead.id))));
        Ok(picked.cloned())
    }

    async fn set_current_lead(
        &mut self,
        worker_id: &WorkerId,
        lead_id: Option<&LeadId>,
    ) -> Result<(), ApplicationError> {
        if !self.working.workers.contains_key(worker_id) {
            return Err(DomainError::WorkerNotFound(worker_id.clone()).into());
        }
        if let Some(lead_id) = lead_id {
            if let Some(holder) = self.working.holder_of(lead_id) {
                return Err(ApplicationError::Persistence(format!(
                    "lead {lead_id} is already held by worker {holder}"
                )));
            }
        }

        let Some(worker) = self.working.workers.get_mut(worker_id) else {
            return Err(DomainError::WorkerNotFound(worker_id.clone()).into());
        };
        match lead_id {
            Some(lead_id) if worker.current_lead.is_some() => {
                Err(DomainError::InvariantViolation(format!(
                    "worker {worker_id} cannot take lead {lead_id} while holding another"
                ))
                .into())
            }
            Some(lead_id) => {
                worker.current_lead = Some(lead_id.clone());
                Ok(())
            }
            None => {
                worker.current_lead = None;
                Ok(())
            }
        }
    }

    async fn queue_head(
        &mut self,
        worker_id: &WorkerId,
    ) -> Result<Option<LeadQueueEntry>, ApplicationError> {
        Ok(self.working.queue_head(worker_id))
    }

    async fn push_queue_entry(
        &mut self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
        created_at: DateTime<Utc>,
    ) -> Result<LeadQueueEntry, ApplicationError> {
        let entries = self.working.queues.entry(worker_id.clone()).or_default();
        let entry = LeadQueueEntry {
            id: LeadQueueEntryId(Uuid::new_v4().to_string()),
            worker_id: worker_id.clone(),
            lead_id: lead_id.clone(),
            position: next_position(entries.iter().map(|entry| entry.position)),
            created_at,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn remove_queue_entry(
        &mut self,
        entry: &LeadQueueEntry,
    ) -> Result<(), ApplicationError> {
        if let Some(entries) = self.working.queues.get_mut(&entry.worker_id) {
            entries.retain(|queued| queued.id != entry.id);
            compact_after(entries, entry.position);
        }
        Ok(())
    }

    async fn count_logs(&mut self, lead_id: &LeadId) -> Result<u32, ApplicationError> {
        let count = self.working.logs.iter().filter(|log| &log.lead_id == lead_id).count();
        u32::try_from(count)
            .map_err(|_| ApplicationError::Persistence(format!("log count overflow: {count}")))
    }

    async fn append_log(&mut self, log: &LeadLog) -> Result<(), ApplicationError> {
        self.working.logs.push(log.clone());
        Ok(())
    }

    async fn update_disposition(
        &mut self,
        lead_id: &LeadId,
        state: Option<LeadState>,
        shift: Option<Shift>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let lead = self
            .working
            .leads
            .get_mut(lead_id)
            .ok_or_else(|| DomainError::LeadNotFound(lead_id.clone()))?;
        lead.state = state;
        if shift.is_some() {
            lead.shift = shift;
        }
        lead.updated_at = updated_at;
        Ok(())
    }

    async fn insert_scheduled_call(
        &mut self,
        call: &ScheduledCall,
    ) -> Result<(), ApplicationError> {
        self.working.calls.push(call.clone());
        Ok(())
    }

    async fn find_lead_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Lead>, ApplicationError> {
        let state = &self.working;
        Ok(state
            .leads
            .values()
            .find(|lead| lead.external_id == external_id)
            .and_then(|lead| state.lead(&lead.id)))
    }

    async fn phone_in_use(&mut self, phone: &str) -> Result<bool, ApplicationError> {
        Ok(self.working.leads.values().any(|lead| lead.phone.as_deref() == Some(phone)))
    }

    async fn insert_lead(&mut self, lead: &Lead) -> Result<(), ApplicationError> {
        if self.working.leads.contains_key(&lead.id) {
            return Err(ApplicationError::Persistence(format!("lead {} already exists", lead.id)));
        }
        self.working.leads.insert(lead.id.clone(), Lead { holder: None, ..lead.clone() });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
        let InMemoryLeadUnit { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl LeadSeeder for InMemoryLeadStore {
    async fn seed_campaign(&self, campaign: &Campaign) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(())
    }

    async fn seed_group(&self, group: &Group) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(missing) =
            group.campaigns.iter().find(|campaign| !state.campaigns.contains_key(*campaign))
        {
            return Err(RepositoryError::MissingReference(format!("campaign {missing}")));
        }
        state.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn seed_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.leads.insert(lead.id.clone(), Lead { holder: None, ..lead.clone() });
        Ok(())
    }

    async fn seed_worker(
        &self,
        worker: &Worker,
        memberships: &[GroupId],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(lead_id) = &worker.current_lead {
            if !state.leads.contains_key(lead_id) {
                return Err(RepositoryError::MissingReference(format!("lead {lead_id}")));
            }
        }
        if let Some(missing) = memberships.iter().find(|group| !state.groups.contains_key(*group)) {
            return Err(RepositoryError::MissingReference(format!("group {missing}")));
        }

        state.workers.insert(worker.id.clone(), worker.clone());
        state.memberships.insert(worker.id.clone(), memberships.iter().cloned().collect());
        Ok(())
    }

    async fn seed_document(&self, document: &LeadDocument) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.documents.push(document.clone());
        Ok(())
    }

    async fn seed_log(&self, log: &LeadLog) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.logs.push(log.clone());
        Ok(())
    }

    async fn seed_queue_entry(&self, entry: &LeadQueueEntry) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.queues.entry(entry.worker_id.clone()).or_default().push(entry.clone());
        Ok(())
    }

    async fn seed_scheduled_call(&self, call: &ScheduledCall) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.calls.push(call.clone());
        Ok(())
    }

    async fn seed_share_grant(&self, grant: &ShareLeadGrant) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.grants.push(grant.clone());
        Ok(())
    }
}
