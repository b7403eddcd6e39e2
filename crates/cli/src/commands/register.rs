use leadflow_core::domain::group::CampaignId;
use leadflow_core::domain::lead::NewLead;
use leadflow_core::domain::worker::WorkerId;

use crate::commands::{operation_failure, run_with_dispatcher, to_data, CommandResult};

#[derive(Debug, Clone, Default)]
pub struct RegisterArgs {
    pub external_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub campaign: Option<String>,
    pub registered_by: Option<String>,
}

pub fn run(args: RegisterArgs) -> CommandResult {
    let registrar = args.registered_by.as_deref().map(|id| WorkerId(id.trim().to_string()));
    let new_lead = NewLead {
        external_id: args.external_id,
        full_name: args.name,
        phone: args.phone,
        email: args.email,
        campaign_id: args.campaign.map(CampaignId),
    };

    run_with_dispatcher("register", |dispatcher| async move {
        let lead = dispatcher
            .register_lead(new_lead, registrar.as_ref())
            .await
            .map_err(operation_failure)?;

        let message = match (&lead.state, &lead.holder) {
            (Some(_), Some(holder)) => {
                format!("lead {} repeats a known phone; handed to worker {holder}", lead.id)
            }
            (Some(_), None) => format!("lead {} repeats a known phone", lead.id),
            _ => format!("lead {} registered", lead.id),
        };
        Ok((message, to_data(&lead)?))
    })
}
