use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadflow_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// Renders the effective configuration, one line per key, with the layer
/// each value came from. Secrets are never printed.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_token = config
        .notifier
        .api_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let rows: Vec<(&str, &str, String)> = vec![
        ("database.url", "LEADFLOW_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "LEADFLOW_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "LEADFLOW_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        (
            "dispatch.super_admin_group_id",
            "LEADFLOW_DISPATCH_SUPER_ADMIN_GROUP",
            config.dispatch.super_admin_group_id.to_string(),
        ),
        (
            "dispatch.no_contesta_escalation_threshold",
            "LEADFLOW_DISPATCH_ESCALATION_THRESHOLD",
            config.dispatch.no_contesta_escalation_threshold.to_string(),
        ),
        ("notifier.enabled", "LEADFLOW_NOTIFIER_ENABLED", config.notifier.enabled.to_string()),
        (
            "notifier.webhook_url",
            "LEADFLOW_NOTIFIER_WEBHOOK_URL",
            config.notifier.webhook_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("notifier.api_token", "LEADFLOW_NOTIFIER_API_TOKEN", api_token),
        (
            "notifier.timeout_secs",
            "LEADFLOW_NOTIFIER_TIMEOUT_SECS",
            config.notifier.timeout_secs.to_string(),
        ),
        ("logging.level", "LEADFLOW_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "LEADFLOW_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ];

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, env_key, value) in rows {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("leadflow.toml"), PathBuf::from("config/leadflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
