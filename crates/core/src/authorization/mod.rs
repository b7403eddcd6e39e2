//! Lead authorization.
//!
//! Denials are ordinary values; only storage failures surface as errors.
//! Checks read the store without taking any worker lock.

pub mod decision;

use std::sync::Arc;

use tracing::debug;

pub use decision::{Actor, AuthorizationDecision, DenialReason, LeadAction};

use crate::domain::group::GroupId;
use crate::domain::lead::{Lead, LeadId};
use crate::domain::worker::WorkerId;
use crate::errors::ApplicationError;
use crate::hierarchy::HierarchyResolver;
use crate::ports::LeadStore;

#[derive(Clone)]
pub struct LeadAuthorizer {
    store: Arc<dyn LeadStore>,
    hierarchy: HierarchyResolver,
    super_admin_group: GroupId,
}

impl LeadAuthorizer {
    pub fn new(store: Arc<dyn LeadStore>, super_admin_group: GroupId) -> Self {
        let hierarchy = HierarchyResolver::new(Arc::clone(&store));
        Self { store, hierarchy, super_admin_group }
    }

    fn is_admin(&self, actor: &Actor) -> bool {
        actor.group_id == self.super_admin_group
    }

    pub async fn can_perform_action(
        &self,
        actor: &Actor,
        lead_id: &LeadId,
        action: LeadAction,
    ) -> Result<AuthorizationDecision, ApplicationError> {
        let decision = self.evaluate_action(actor, lead_id, action).await?;
        debug!(
            event_name = "lead.authorization.evaluated",
            worker_id = %actor.worker_id,
            lead_id = %lead_id,
            action = action.as_str(),
            allowed = decision.allowed,
            reason = decision.reason.as_deref().unwrap_or(""),
            "lead action evaluated"
        );
        Ok(decision)
    }

    async fn evaluate_action(
        &self,
        actor: &Actor,
        lead_id: &LeadId,
        action: LeadAction,
    ) -> Result<AuthorizationDecision, ApplicationError> {
        if self.is_admin(actor) {
            return Ok(AuthorizationDecision::allow());
        }
        if action == LeadAction::Delete {
            return Ok(AuthorizationDecision::deny(DenialReason::OnlyAdminCanDeleteLeads));
        }
        let Some(lead) = self.store.find_lead(lead_id).await? else {
            return Ok(AuthorizationDecision::deny(DenialReason::LeadNotFound));
        };

        if lead.holder.as_ref() == Some(&actor.worker_id) && action.open_to_holder() {
            return Ok(AuthorizationDecision::allow());
        }

        if action.open_to_follow_up() && self.follows_up(&actor.worker_id, lead_id).await? {
            return Ok(AuthorizationDecision::allow());
        }

        if actor.is_manager && self.manages(actor, &lead).await? {
            return Ok(AuthorizationDecision::allow());
        }

        Ok(AuthorizationDecision::deny(action.denial()))
    }

    async fn follows_up(
        &self,
        worker_id: &WorkerId,
        lead_id: &LeadId,
    ) -> Result<bool, ApplicationError> {
        Ok(self.store.has_queue_entry(worker_id, lead_id).await?
            || self.store.has_scheduled_call(worker_id, lead_id).await?)
    }

    /// A manager oversees leads of campaigns linked to any of their groups
    /// and leads held by anyone below their group.
    async fn manages(&self, actor: &Actor, lead: &Lead) -> Result<bool, ApplicationError> {
        if let Some(campaign_id) = &lead.campaign_id {
            let mut groups = self.store.groups_for_worker(&actor.worker_id).await?;
            if !groups.iter().any(|group| group.id == actor.group_id) {
                if let Some(primary) = self.store.find_group(&actor.group_id).await? {
                    groups.push(primary);
                }
            }
            if groups.iter().any(|group| group.campaigns.contains(campaign_id)) {
                return Ok(true);
            }
        }

        match &lead.holder {
            Some(holder) => self.hierarchy.is_descendant(&actor.group_id, holder).await,
            None => Ok(false),
        }
    }

    pub async fn can_assign_to(
        &self,
        actor: &Actor,
        target_id: &WorkerId,
    ) -> Result<AuthorizationDecision, ApplicationError> {
        if self.is_admin(actor) {
            return Ok(AuthorizationDecision::allow());
        }
        let Some(target) = self.store.find_worker(target_id).await? else {
            return Ok(AuthorizationDecision::deny(DenialReason::TargetNotFound));
        };

        let allowed = if actor.is_manager {
            target.group_id == actor.group_id
                || target.parent_group_id.as_ref() == Some(&actor.group_id)
                || self.hierarchy.is_descendant(&actor.group_id, target_id).await?
        } else {
            self.store.has_share_grant(&actor.worker_id, target_id).await?
        };

        debug!(
            event_name = "lead.authorization.assign_evaluated",
            worker_id = %actor.worker_id,
            target_worker_id = %target_id,
            allowed,
            "assignment target evaluated"
        );

        if allowed {
            Ok(AuthorizationDecision::allow())
        } else {
            Ok(AuthorizationDecision::deny(DenialReason::CannotAssignToUser))
        }
    }
}
