use std::process::ExitCode;

use leadflow_core::config::{AppConfig, LoadOptions};

fn main() -> ExitCode {
    // Config errors are reported by the command itself; logging falls back to
    // defaults here.
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    leadflow_cli::init_logging(&logging);

    leadflow_cli::run()
}
