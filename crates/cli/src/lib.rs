pub mod commands;
pub mod notifier;

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use leadflow_core::authorization::LeadAction;
use leadflow_core::config::{LogFormat, LoggingConfig};

use crate::commands::outcome::TypeArgs;
use crate::commands::register::RegisterArgs;

#[derive(Debug, Parser)]
#[command(
    name = "leadflow",
    about = "Leadflow operator CLI",
    long_about = "Operate lead dispatch: migrations, demo data, assignment, outcome typing, queues and authorization checks.",
    after_help = "Examples:\n  leadflow seed\n  leadflow assign --worker W1\n  leadflow type --worker W2 --outcome Venta --observations cerrado\n  leadflow authorize --actor M1 --lead L6 --action view"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo floor (idempotent)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Hand the next lead to a worker, or return the lead it already holds")]
    Assign {
        #[arg(long)]
        worker: String,
    },
    #[command(about = "Record the outcome of the worker's current call")]
    Type {
        #[arg(long)]
        worker: String,
        #[arg(long)]
        outcome: String,
        #[arg(long, default_value = "")]
        observations: String,
        #[arg(long, help = "Worker receiving the lead for AgendarUsuario")]
        target: Option<String>,
        #[arg(long, help = "Callback subject for AgendaPersonal")]
        subject: Option<String>,
        #[arg(long, value_parser = parse_timestamp, help = "RFC 3339 callback start for AgendaPersonal")]
        start_date: Option<DateTime<Utc>>,
        #[arg(long)]
        notes: Option<String>,
    },
    #[command(about = "Append a lead to the tail of a worker's queue")]
    Enqueue {
        #[arg(long)]
        worker: String,
        #[arg(long)]
        lead: String,
    },
    #[command(about = "Remove the head of a worker's queue")]
    Dequeue {
        #[arg(long)]
        worker: String,
    },
    #[command(about = "List a worker's queue in position order")]
    Queue {
        #[arg(long)]
        worker: String,
    },
    #[command(about = "Check whether a worker may perform an action on a lead")]
    Authorize {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        lead: String,
        #[arg(long, value_parser = parse_action)]
        action: LeadAction,
    },
    #[command(name = "can-assign", about = "Check whether a worker may hand leads to another")]
    CanAssign {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
    },
    #[command(about = "Register a new lead, flagging repeated phone numbers")]
    Register {
        #[arg(long)]
        external_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        registered_by: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Assign { worker } => commands::assign::run(&worker),
        Command::Type { worker, outcome, observations, target, subject, start_date, notes } => {
            commands::outcome::run(TypeArgs {
                worker,
                outcome,
                observations,
                target,
                subject,
                start_date,
                notes,
            })
        }
        Command::Enqueue { worker, lead } => commands::queue::enqueue(&worker, &lead),
        Command::Dequeue { worker } => commands::queue::dequeue(&worker),
        Command::Queue { worker } => commands::queue::list(&worker),
        Command::Authorize { actor, lead, action } => {
            commands::authorize::action(&actor, &lead, action)
        }
        Command::CanAssign { actor, target } => commands::authorize::assign_target(&actor, &target),
        Command::Register { external_id, name, phone, email, campaign, registered_by } => {
            commands::register::run(RegisterArgs {
                external_id,
                name,
                phone,
                email,
                campaign,
                registered_by,
            })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global subscriber. Logs go to stderr so stdout stays a single
/// JSON envelope.
pub fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| format!("expected an RFC 3339 timestamp: {error}"))
}

fn parse_action(value: &str) -> Result<LeadAction, String> {
    LeadAction::parse(value).ok_or_else(|| {
        let known = LeadAction::ALL.iter().map(LeadAction::as_str).collect::<Vec<_>>();
        format!("unknown action `{value}` (expected one of {})", known.join("|"))
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use leadflow_core::authorization::LeadAction;

    use super::{parse_action, parse_timestamp, Cli, Command};

    #[test]
    fn type_command_parses_agenda_arguments() {
        let cli = Cli::try_parse_from([
            "leadflow",
            "type",
            "--worker",
            "W2",
            "--outcome",
            "AgendaPersonal",
            "--subject",
            "Call back",
            "--start-date",
            "2024-06-01T10:00:00Z",
        ])
        .expect("parse");

        let Command::Type { worker, subject, start_date, observations, .. } = cli.command else {
            panic!("expected type command");
        };
        assert_eq!(worker, "W2");
        assert_eq!(subject.as_deref(), Some("Call back"));
        assert_eq!(observations, "");
        assert_eq!(start_date, parse_timestamp("2024-06-01T10:00:00Z").ok());
    }

    #[test]
    fn authorize_rejects_unknown_actions() {
        assert_eq!(parse_action("manage_queue"), Ok(LeadAction::ManageQueue));
        assert!(parse_action("archive").is_err_and(|message| message.contains("view")));

        let parsed = Cli::try_parse_from([
            "leadflow", "authorize", "--actor", "M1", "--lead", "L6", "--action", "archive",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn can_assign_uses_kebab_case_name() {
        let cli = Cli::try_parse_from(["leadflow", "can-assign", "--actor", "M1", "--target", "W1"])
            .expect("parse");

        assert!(matches!(cli.command, Command::CanAssign { .. }));
    }
}
