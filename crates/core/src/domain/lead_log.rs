use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;
use crate::domain::worker::WorkerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadLogId(pub String);

/// Append-only record of one typing attempt. The outcome is kept exactly as
/// the worker sent it, including tags the state machine does not handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadLog {
    pub id: LeadLogId,
    pub worker_id: WorkerId,
    pub lead_id: LeadId,
    pub outcome: String,
    pub observations: String,
    pub created_at: DateTime<Utc>,
}

impl LeadLog {
    pub fn record(
        worker_id: WorkerId,
        lead_id: LeadId,
        outcome: impl Into<String>,
        observations: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LeadLogId(Uuid::new_v4().to_string()),
            worker_id,
            lead_id,
            outcome: outcome.into(),
            observations: observations.into(),
            created_at,
        }
    }
}
