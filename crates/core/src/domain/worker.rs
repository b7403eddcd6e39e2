use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::domain::lead::LeadId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub group_id: GroupId,
    pub parent_group_id: Option<GroupId>,
    pub is_manager: bool,
    /// Raw strategy tags in evaluation order, e.g. `["fromQueue", "oldestFirst"]`.
    pub priorities: Vec<String>,
    pub current_lead: Option<LeadId>,
}

impl Worker {
    pub fn link(&self) -> WorkerLink {
        WorkerLink {
            worker_id: self.id.clone(),
            group_id: self.group_id.clone(),
            parent_group_id: self.parent_group_id.clone(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_lead.is_none()
    }
}

/// One edge of the reporting tree: the worker sits in `group_id` and reports
/// upward to `parent_group_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLink {
    pub worker_id: WorkerId,
    pub group_id: GroupId,
    pub parent_group_id: Option<GroupId>,
}
