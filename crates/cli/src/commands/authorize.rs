use leadflow_core::authorization::{AuthorizationDecision, LeadAction};
use leadflow_core::domain::lead::LeadId;
use leadflow_core::domain::worker::WorkerId;

use crate::commands::{operation_failure, run_with_dispatcher, to_data, CommandResult};

pub fn action(actor: &str, lead: &str, action: LeadAction) -> CommandResult {
    let actor_id = WorkerId(actor.trim().to_string());
    let lead_id = LeadId(lead.trim().to_string());
    run_with_dispatcher("authorize", |dispatcher| async move {
        let actor = dispatcher.actor_for(&actor_id).await.map_err(operation_failure)?;
        let decision = dispatcher
            .can_perform_action(&actor, &lead_id, action)
            .await
            .map_err(operation_failure)?;
        let subject = format!("{actor_id} {} lead {lead_id}", action.as_str());
        Ok((describe(&subject, &decision), to_data(&decision)?))
    })
}

pub fn assign_target(actor: &str, target: &str) -> CommandResult {
    let actor_id = WorkerId(actor.trim().to_string());
    let target_id = WorkerId(target.trim().to_string());
    run_with_dispatcher("can-assign", |dispatcher| async move {
        let actor = dispatcher.actor_for(&actor_id).await.map_err(operation_failure)?;
        let decision =
            dispatcher.can_assign_to(&actor, &target_id).await.map_err(operation_failure)?;
        let subject = format!("{actor_id} hand off to {target_id}");
        Ok((describe(&subject, &decision), to_data(&decision)?))
    })
}

fn describe(subject: &str, decision: &AuthorizationDecision) -> String {
    match decision.reason.as_deref() {
        None => format!("allowed: {subject}"),
        Some(reason) => format!("denied ({reason}): {subject}"),
    }
}

#[cfg(test)]
mod tests {
    use leadflow_core::authorization::{AuthorizationDecision, DenialReason};

    use super::describe;

    #[test]
    fn denials_lead_with_their_reason_code() {
        let denied = AuthorizationDecision::deny(DenialReason::NoViewPermission);

        assert_eq!(describe("W1 view lead L6", &denied), "denied (no-view-permission): W1 view lead L6");
        assert_eq!(describe("W2 edit lead L3", &AuthorizationDecision::allow()), "allowed: W2 edit lead L3");
    }
}
