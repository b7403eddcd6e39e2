use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::domain::normalize_tag;
use crate::domain::worker::{Worker, WorkerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadAction {
    View,
    Edit,
    Delete,
    Reassign,
    Type,
    ManageCalls,
    ManageDocuments,
    ManageQueue,
}

impl LeadAction {
    pub const ALL: [LeadAction; 8] = [
        Self::View,
        Self::Edit,
        Self::Delete,
        Self::Reassign,
        Self::Type,
        Self::ManageCalls,
        Self::ManageDocuments,
        Self::ManageQueue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Reassign => "reassign",
            Self::Type => "type",
            Self::ManageCalls => "manage_calls",
            Self::ManageDocuments => "manage_documents",
            Self::ManageQueue => "manage_queue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_tag(value).as_str() {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            "delete" => Some(Self::Delete),
            "reassign" => Some(Self::Reassign),
            "type" => Some(Self::Type),
            "managecalls" => Some(Self::ManageCalls),
            "managedocuments" => Some(Self::ManageDocuments),
            "managequeue" => Some(Self::ManageQueue),
            _ => None,
        }
    }

    /// Actions the current holder of a lead may perform on it.
    pub(crate) fn open_to_holder(&self) -> bool {
        matches!(
            self,
            Self::View
                | Self::Edit
                | Self::Reassign
                | Self::Type
                | Self::ManageCalls
                | Self::ManageDocuments
        )
    }

    /// Actions open to a worker that has the lead queued or a call booked.
    pub(crate) fn open_to_follow_up(&self) -> bool {
        matches!(self, Self::View | Self::ManageCalls | Self::ManageQueue)
    }

    pub(crate) fn denial(&self) -> DenialReason {
        match self {
            Self::View => DenialReason::NoViewPermission,
            Self::Edit | Self::ManageDocuments => DenialReason::NoEditPermission,
            Self::Delete => DenialReason::OnlyAdminCanDeleteLeads,
            Self::Reassign => DenialReason::NoReassignPermission,
            Self::Type => DenialReason::NoTypePermission,
            Self::ManageCalls => DenialReason::NoCallsPermission,
            Self::ManageQueue => DenialReason::NoQueuePermission,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    OnlyAdminCanDeleteLeads,
    LeadNotFound,
    NoViewPermission,
    NoEditPermission,
    NoReassignPermission,
    NoTypePermission,
    NoCallsPermission,
    NoQueuePermission,
    TargetNotFound,
    CannotAssignToUser,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OnlyAdminCanDeleteLeads => "only-admin-can-delete-leads",
            Self::LeadNotFound => "lead-not-found",
            Self::NoViewPermission => "no-view-permission",
            Self::NoEditPermission => "no-edit-permission",
            Self::NoReassignPermission => "no-reassign-permission",
            Self::NoTypePermission => "no-type-permission",
            Self::NoCallsPermission => "no-calls-permission",
            Self::NoQueuePermission => "no-queue-permission",
            Self::TargetNotFound => "target-not-found",
            Self::CannotAssignToUser => "cannot-assign-to-user",
        }
    }
}

/// The worker a permission check is evaluated for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub worker_id: WorkerId,
    pub group_id: GroupId,
    pub parent_group_id: Option<GroupId>,
    pub is_manager: bool,
}

impl From<&Worker> for Actor {
    fn from(worker: &Worker) -> Self {
        Self {
            worker_id: worker.id.clone(),
            group_id: worker.group_id.clone(),
            parent_group_id: worker.parent_group_id.clone(),
            is_manager: worker.is_manager,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn deny(reason: DenialReason) -> Self {
        Self { allowed: false, reason: Some(reason.code().to_string()) }
    }
}
