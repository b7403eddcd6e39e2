//! Seams between the core services and their collaborators.
//!
//! `LeadStore` covers persistence, including the campaign/group membership
//! lookup, the attachment-existence check and scheduled-callback creation.
//! `ContactNotifier` is the best-effort outbound channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::assignment::CandidateQuery;
use crate::domain::group::{Group, GroupId};
use crate::domain::lead::{Lead, LeadId, LeadState, Shift};
use crate::domain::lead_log::LeadLog;
use crate::domain::queue::LeadQueueEntry;
use crate::domain::schedule::ScheduledCall;
use crate::domain::worker::{Worker, WorkerId, WorkerLink};
use crate::errors::ApplicationError;

/// Read side plus the entry point to atomic units of work. Reads outside a
/// unit are unsynchronized and used by authorization checks.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LeadUnitOfWork>, ApplicationError>;

    async fn find_worker(&self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError>;

    async fn find_lead(&self, id: &LeadId) -> Result<Option<Lead>, ApplicationError>;

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, ApplicationError>;

    /// Groups the worker is a member of, each with its linked campaigns.
    async fn groups_for_worker(&self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError>;

    async fn worker_links(&self) -> Result<Vec<WorkerLink>, ApplicationError>;

    async fn list_queue(&self, worker_id: &WorkerId)
        -> Result<Vec<LeadQueueEntry>, ApplicationError>;

    async fn has_queue_entry(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError>;

    async fn has_scheduled_call(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError>;

    async fn has_share_grant(
        &self,
        grantor: &WorkerId,
        grantee: &WorkerId,
    ) -> Result<bool, ApplicationError>;

    async fn logs_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadLog>, ApplicationError>;
}

/// One atomic transaction. Dropping a unit without `commit` discards every
/// write made through it.
#[async_trait]
pub trait LeadUnitOfWork: Send {
    /// Takes the exclusive write lock scoped to the worker row and returns
    /// the worker as seen inside the unit.
    async fn lock_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError>;

    async fn find_worker(&mut self, id: &WorkerId) -> Result<Option<Worker>, ApplicationError>;

    async fn find_lead(&mut self, id: &LeadId) -> Result<Option<Lead>, ApplicationError>;

    async fn groups_for_worker(&mut self, id: &WorkerId) -> Result<Vec<Group>, ApplicationError>;

    /// First lead admitted by `query` in the query's order.
    async fn first_pool_candidate(
        &mut self,
        query: &CandidateQuery,
    ) -> Result<Option<Lead>, ApplicationError>;

    /// Transfers (or with `None` releases) the worker's held lead. An
    /// unknown worker is `WorkerNotFound`.
    async fn set_current_lead(
        &mut self,
        worker_id: &WorkerId,
        lead_id: Option<&LeadId>,
    ) -> Result<(), ApplicationError>;

    async fn queue_head(
        &mut self,
        worker_id: &WorkerId,
    ) -> Result<Option<LeadQueueEntry>, ApplicationError>;

    /// Appends behind the worker's current tail.
    async fn push_queue_entry(
        &mut self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
        created_at: DateTime<Utc>,
    ) -> Result<LeadQueueEntry, ApplicationError>;

    /// Deletes the entry and shifts every later entry of the same worker down
    /// by one.
    async fn remove_queue_entry(&mut self, entry: &LeadQueueEntry)
        -> Result<(), ApplicationError>;

    async fn count_logs(&mut self, lead_id: &LeadId) -> Result<u32, ApplicationError>;

    async fn append_log(&mut self, log: &LeadLog) -> Result<(), ApplicationError>;

    /// Writes `state` (where `None` clears it), overwrites the shift only when
    /// `shift` is `Some`, and stamps `updated_at`.
    async fn update_disposition(
        &mut self,
        lead_id: &LeadId,
        state: Option<LeadState>,
        shift: Option<Shift>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;

    async fn insert_scheduled_call(&mut self, call: &ScheduledCall)
        -> Result<(), ApplicationError>;

    async fn find_lead_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<Lead>, ApplicationError>;

    async fn phone_in_use(&mut self, phone: &str) -> Result<bool, ApplicationError>;

    /// Inserts a lead row; the holder field is ignored.
    async fn insert_lead(&mut self, lead: &Lead) -> Result<(), ApplicationError>;

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError>;
}

#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn lead_assigned(&self, worker: &Worker, lead: &Lead) -> Result<(), ApplicationError>;
}
