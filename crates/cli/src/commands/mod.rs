pub mod assign;
pub mod authorize;
pub mod config;
pub mod migrate;
pub mod outcome;
pub mod queue;
pub mod register;
pub mod seed;

use std::future::Future;
use std::sync::Arc;

use leadflow_core::config::{AppConfig, LoadOptions};
use leadflow_core::dispatcher::LeadDispatcher;
use leadflow_core::errors::ApplicationError;
use leadflow_db::{connect_with_config, migrations, DbPool, SqlLeadStore};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::notifier::notifier_from_config;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            hint: None,
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &'static str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::from_failure(command, Failure::new(error_class, message, exit_code))
    }

    fn from_failure(command: &str, failure: Failure) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(failure.error_class.to_string()),
            message: failure.message,
            hint: failure.hint.map(str::to_string),
            correlation_id: failure.correlation_id,
            data: None,
        };
        Self { exit_code: failure.exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error carried out of an async command body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
    /// User-safe text for operation failures.
    pub hint: Option<&'static str>,
    pub correlation_id: Option<String>,
}

impl Failure {
    pub(crate) fn new(
        error_class: &'static str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self { error_class, message: message.into(), exit_code, hint: None, correlation_id: None }
    }
}

/// Successful command body output: a human message plus optional JSON data.
pub(crate) type Report = (String, Option<Value>);

pub(crate) const EXIT_OPERATION: u8 = 7;

/// Shared shell of every database-backed command: load config, build a
/// current-thread runtime, connect, apply migrations, run `body`, close.
pub(crate) fn run_with_pool<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig, DbPool) -> Fut,
    Fut: Future<Output = Result<Report, Failure>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| Failure::new("db_connectivity", error.to_string(), 4))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| Failure::new("migration", error.to_string(), 5))?;

        let outcome = body(config, pool.clone()).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok((message, data)) => CommandResult::success_with_data(command, message, data),
        Err(failure) => CommandResult::from_failure(command, failure),
    }
}

/// Same as [`run_with_pool`] with a dispatcher wired over the SQLite store
/// and the configured notifier.
pub(crate) fn run_with_dispatcher<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(LeadDispatcher) -> Fut,
    Fut: Future<Output = Result<Report, Failure>>,
{
    run_with_pool(command, |config, pool| async move {
        let notifier = notifier_from_config(&config.notifier)
            .map_err(|error| Failure::new("notifier_init", error.to_string(), 2))?;
        let dispatcher =
            LeadDispatcher::new(Arc::new(SqlLeadStore::new(pool)), notifier, &config.dispatch);
        body(dispatcher).await
    })
}

/// Maps a core error onto the envelope through its interface form. The class
/// stays the stable error code; the correlation id ties the envelope to the
/// logged failure.
pub(crate) fn operation_failure(error: ApplicationError) -> Failure {
    let error_class = error.code();
    let interface = error.into_interface(Uuid::new_v4().to_string());
    warn!(
        event_name = "cli.operation.failed",
        correlation_id = %interface.correlation_id(),
        error_class,
        error = %interface,
        "operation failed"
    );

    Failure {
        error_class,
        message: interface.to_string(),
        exit_code: EXIT_OPERATION,
        hint: Some(interface.user_message()),
        correlation_id: Some(interface.correlation_id().to_string()),
    }
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Option<Value>, Failure> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|error| Failure::new("serialization", error.to_string(), EXIT_OPERATION))
}

#[cfg(test)]
mod tests {
    use leadflow_core::domain::worker::WorkerId;
    use leadflow_core::errors::{ApplicationError, DomainError};
    use serde_json::Value;

    use super::{operation_failure, CommandResult, EXIT_OPERATION};

    #[test]
    fn failure_envelope_omits_data() {
        let result = CommandResult::failure("assign", "no-available-lead", "nothing left", 7);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "no-available-lead");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn domain_errors_keep_their_code_as_error_class() {
        let failure = operation_failure(ApplicationError::from(DomainError::EmptyQueue {
            worker_id: WorkerId("W6".to_string()),
        }));

        assert_eq!(failure.error_class, "empty-queue");
        assert_eq!(failure.message, "conflict: lead queue of worker W6 is empty");
        assert_eq!(failure.exit_code, EXIT_OPERATION);
        assert_eq!(
            failure.hint,
            Some("Nothing can be handed out right now. Try again later.")
        );
    }

    #[test]
    fn operation_failures_carry_hint_and_correlation_id() {
        let failure = operation_failure(ApplicationError::from(DomainError::WorkerNotFound(
            WorkerId("GHOST".to_string()),
        )));
        let correlation_id = failure.correlation_id.clone().expect("correlation id");
        let result = CommandResult::from_failure("assign", failure);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, EXIT_OPERATION);
        assert_eq!(payload["error_class"], "worker-not-found");
        assert_eq!(payload["message"], "not found: worker GHOST not found");
        assert_eq!(payload["hint"], "The requested worker or lead does not exist.");
        assert_eq!(payload["correlation_id"], correlation_id.as_str());
        assert!(!correlation_id.is_empty());
    }

    #[test]
    fn plain_failures_have_no_hint() {
        let payload: Value = serde_json::from_str(
            &CommandResult::failure("migrate", "migration", "bad checksum", 5).output,
        )
        .expect("json");

        assert!(payload.get("hint").is_none());
        assert!(payload.get("correlation_id").is_none());
    }
}
