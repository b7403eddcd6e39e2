use chrono::{DateTime, Utc};
use leadflow_core::domain::worker::WorkerId;
use leadflow_core::outcome::OutcomeOptions;

use crate::commands::{operation_failure, run_with_dispatcher, to_data, CommandResult};

/// Arguments of `leadflow type`, as parsed by clap.
#[derive(Debug, Clone, Default)]
pub struct TypeArgs {
    pub worker: String,
    pub outcome: String,
    pub observations: String,
    pub target: Option<String>,
    pub subject: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl TypeArgs {
    fn options(&self) -> OutcomeOptions {
        OutcomeOptions {
            target_worker: self
                .target
                .as_deref()
                .map(str::trim)
                .filter(|target| !target.is_empty())
                .map(|target| WorkerId(target.to_string())),
            subject: self.subject.clone(),
            start_date: self.start_date,
            notes: self.notes.clone(),
        }
    }
}

pub fn run(args: TypeArgs) -> CommandResult {
    let worker_id = WorkerId(args.worker.trim().to_string());
    let options = args.options();
    run_with_dispatcher("type", |dispatcher| async move {
        let lead = dispatcher
            .type_outcome(&worker_id, &args.outcome, &args.observations, options)
            .await
            .map_err(operation_failure)?;

        let message = match lead.state {
            Some(state) if lead.holder.is_none() => {
                format!("lead {} typed as {}", lead.id, state.as_str())
            }
            _ if lead.holder.is_none() => format!("lead {} parked for a later shift", lead.id),
            _ => format!("worker {worker_id} had no lead and now works lead {}", lead.id),
        };
        Ok((message, to_data(&lead)?))
    })
}

#[cfg(test)]
mod tests {
    use super::TypeArgs;

    #[test]
    fn blank_target_is_treated_as_missing() {
        let args = TypeArgs {
            worker: "W2".to_string(),
            outcome: "AgendarUsuario".to_string(),
            target: Some("  ".to_string()),
            ..TypeArgs::default()
        };

        assert_eq!(args.options().target_worker, None);
    }
}
