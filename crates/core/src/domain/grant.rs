use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::worker::WorkerId;

/// Directed permission for a regular worker to hand leads to `grantee`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLeadGrant {
    pub grantor: WorkerId,
    pub grantee: WorkerId,
    pub created_at: DateTime<Utc>,
}
