use std::env;
use std::sync::{Mutex, OnceLock};

use leadflow_cli::commands::outcome::TypeArgs;
use leadflow_cli::commands::register::RegisterArgs;
use leadflow_cli::commands::{assign, authorize, migrate, outcome, queue, register, seed};
use leadflow_core::authorization::LeadAction;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("LEADFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("LEADFLOW_DATABASE_URL", "postgres://localhost/leads")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_seeded_database(|| {
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let payload = parse_payload(&second.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or_default().contains("already present"));
    });
}

#[test]
fn assign_hands_oldest_lead_and_is_stable() {
    with_seeded_database(|| {
        let first = parse_payload(&assign::run("W1").output);
        assert_eq!(first["status"], "ok");
        assert_eq!(first["data"]["id"], "L1");
        assert_eq!(first["data"]["holder"], "W1");

        let second = parse_payload(&assign::run("W1").output);
        assert_eq!(second["data"]["id"], "L1");
    });
}

#[test]
fn assign_reports_domain_errors_by_code() {
    with_seeded_database(|| {
        let result = assign::run("GHOST");
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "worker-not-found");
        assert_eq!(payload["hint"], "The requested worker or lead does not exist.");
        assert!(payload["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    });
}

#[test]
fn type_resolves_held_lead() {
    with_seeded_database(|| {
        let result = outcome::run(TypeArgs {
            worker: "W2".to_string(),
            outcome: "Venta".to_string(),
            observations: "cerrado".to_string(),
            ..TypeArgs::default()
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["id"], "L3");
        assert_eq!(payload["data"]["state"], "venta");
        assert_eq!(payload["data"]["holder"], Value::Null);

        let malformed = outcome::run(TypeArgs {
            worker: "W5".to_string(),
            outcome: "AgendarUsuario".to_string(),
            ..TypeArgs::default()
        });
        assert_eq!(parse_payload(&malformed.output)["error_class"], "target-not-specified");
    });
}

#[test]
fn queue_commands_keep_positions_dense() {
    with_seeded_database(|| {
        let removed = parse_payload(&queue::dequeue("W6").output);
        assert_eq!(removed["data"]["lead_id"], "LA");

        let appended = parse_payload(&queue::enqueue("W6", "L1").output);
        assert_eq!(appended["data"]["position"], 3);

        let listed = parse_payload(&queue::list("W6").output);
        let positions: Vec<(String, u64)> = listed["data"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        (
                            entry["lead_id"].as_str().unwrap_or_default().to_string(),
                            entry["position"].as_u64().unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(
            positions,
            vec![("LB".to_string(), 1), ("LC".to_string(), 2), ("L1".to_string(), 3)]
        );

        let empty = queue::dequeue("W1");
        assert_eq!(parse_payload(&empty.output)["error_class"], "empty-queue");
    });
}

#[test]
fn authorization_commands_report_decisions_not_errors() {
    with_seeded_database(|| {
        let allowed = authorize::action("M1", "L6", LeadAction::View);
        assert_eq!(allowed.exit_code, 0);
        assert_eq!(parse_payload(&allowed.output)["data"]["allowed"], true);

        let denied = parse_payload(&authorize::action("W1", "L6", LeadAction::View).output);
        assert_eq!(denied["status"], "ok");
        assert_eq!(denied["data"]["allowed"], false);
        assert_eq!(denied["data"]["reason"], "no-view-permission");

        let outsider = parse_payload(&authorize::assign_target("M1", "W5").output);
        assert_eq!(outsider["data"]["reason"], "cannot-assign-to-user");

        let admin_delete = parse_payload(&authorize::action("ADMIN", "L1", LeadAction::Delete).output);
        assert_eq!(admin_delete["data"]["allowed"], true);
    });
}

#[test]
fn register_flags_repeated_phone_and_duplicate_external_id() {
    with_seeded_database(|| {
        let repeated = parse_payload(
            &register::run(RegisterArgs {
                external_id: "EXT-NEW".to_string(),
                name: "Repeat caller".to_string(),
                phone: Some("+34600000000".to_string()),
                registered_by: Some("W1".to_string()),
                ..RegisterArgs::default()
            })
            .output,
        );
        assert_eq!(repeated["data"]["state"], "repetido");
        assert_eq!(repeated["data"]["holder"], "W1");

        let duplicate = register::run(RegisterArgs {
            external_id: "EXT-L1".to_string(),
            name: "Clash".to_string(),
            ..RegisterArgs::default()
        });
        assert_eq!(duplicate.exit_code, 7);
        assert_eq!(parse_payload(&duplicate.output)["error_class"], "duplicate-external-id");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a fresh file database already holding the demo
/// floor.
fn with_seeded_database(test_fn: impl FnOnce()) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("leadflow.db").display());

    with_env(&[("LEADFLOW_DATABASE_URL", url.as_str())], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "seed failed: {}", seeded.output);
        let payload = parse_payload(&seeded.output);
        assert_eq!(payload["data"]["workers"], 6);

        test_fn();
    });
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LEADFLOW_DATABASE_URL",
        "LEADFLOW_DATABASE_MAX_CONNECTIONS",
        "LEADFLOW_DATABASE_TIMEOUT_SECS",
        "LEADFLOW_DISPATCH_SUPER_ADMIN_GROUP",
        "LEADFLOW_DISPATCH_ESCALATION_THRESHOLD",
        "LEADFLOW_NOTIFIER_ENABLED",
        "LEADFLOW_NOTIFIER_WEBHOOK_URL",
        "LEADFLOW_NOTIFIER_API_TOKEN",
        "LEADFLOW_NOTIFIER_TIMEOUT_SECS",
        "LEADFLOW_LOGGING_LEVEL",
        "LEADFLOW_LOGGING_FORMAT",
        "LEADFLOW_LOG_LEVEL",
        "LEADFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
