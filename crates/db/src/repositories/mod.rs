use async_trait::async_trait;
use thiserror::Error;

use leadflow_core::domain::grant::ShareLeadGrant;
use leadflow_core::domain::group::{Campaign, Group, GroupId};
use leadflow_core::domain::lead::{Lead, LeadDocument};
use leadflow_core::domain::lead_log::LeadLog;
use leadflow_core::domain::queue::LeadQueueEntry;
use leadflow_core::domain::schedule::ScheduledCall;
use leadflow_core::domain::worker::Worker;
use leadflow_core::errors::ApplicationError;

pub mod memory;
pub mod sql;

pub use memory::InMemoryLeadStore;
pub use sql::SqlLeadStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Bulk loading used by fixtures, the `seed` command and tests. Insert order
/// matters: campaigns, groups, leads, then workers (a worker's held lead must
/// already exist).
#[async_trait]
pub trait LeadSeeder: Send + Sync {
    async fn seed_campaign(&self, campaign: &Campaign) -> Result<(), RepositoryError>;

    /// Stores the group together with its campaign links.
    async fn seed_group(&self, group: &Group) -> Result<(), RepositoryError>;

    /// Stores the lead row. Holders come from `Worker::current_lead`, so
    /// `lead.holder` is ignored.
    async fn seed_lead(&self, lead: &Lead) -> Result<(), RepositoryError>;

    async fn seed_worker(
        &self,
        worker: &Worker,
        memberships: &[GroupId],
    ) -> Result<(), RepositoryError>;

    async fn seed_document(&self, document: &LeadDocument) -> Result<(), RepositoryError>;

    async fn seed_log(&self, log: &LeadLog) -> Result<(), RepositoryError>;

    async fn seed_queue_entry(&self, entry: &LeadQueueEntry) -> Result<(), RepositoryError>;

    async fn seed_scheduled_call(&self, call: &ScheduledCall) -> Result<(), RepositoryError>;

    async fn seed_share_grant(&self, grant: &ShareLeadGrant) -> Result<(), RepositoryError>;
}
