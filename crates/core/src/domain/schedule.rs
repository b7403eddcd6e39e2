use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;
use crate::domain::worker::WorkerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledCallId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCall {
    pub id: ScheduledCallId,
    pub worker_id: WorkerId,
    pub lead_id: LeadId,
    pub subject: String,
    pub starts_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledCall {
    pub fn new(
        worker_id: WorkerId,
        lead_id: LeadId,
        subject: impl Into<String>,
        starts_at: DateTime<Utc>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ScheduledCallId(Uuid::new_v4().to_string()),
            worker_id,
            lead_id,
            subject: subject.into(),
            starts_at,
            notes,
            created_at,
        }
    }
}
