use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadflow_core::config::NotifierConfig;
use leadflow_core::domain::lead::Lead;
use leadflow_core::domain::worker::Worker;
use leadflow_core::errors::ApplicationError;
use leadflow_core::notify::NoopContactNotifier;
use leadflow_core::ports::ContactNotifier;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Posts a JSON notice to an external webhook whenever a lead is handed to a
/// worker. The dispatcher treats every error from here as best-effort.
pub struct WebhookContactNotifier {
    client: Client,
    webhook_url: String,
    api_token: SecretString,
}

#[derive(Debug, Serialize)]
struct LeadAssignedPayload<'a> {
    event: &'static str,
    worker_id: &'a str,
    worker_name: &'a str,
    lead_id: &'a str,
    external_id: &'a str,
    full_name: &'a str,
    phone: Option<&'a str>,
    campaign_id: Option<&'a str>,
}

impl<'a> LeadAssignedPayload<'a> {
    fn new(worker: &'a Worker, lead: &'a Lead) -> Self {
        Self {
            event: "lead.assigned",
            worker_id: &worker.id.0,
            worker_name: &worker.name,
            lead_id: &lead.id.0,
            external_id: &lead.external_id,
            full_name: &lead.full_name,
            phone: lead.phone.as_deref(),
            campaign_id: lead.campaign_id.as_ref().map(|campaign| campaign.0.as_str()),
        }
    }
}

impl WebhookContactNotifier {
    pub fn new(
        webhook_url: impl Into<String>,
        api_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ApplicationError> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ApplicationError::Configuration(format!("failed to build webhook client: {error}"))
        })?;
        Ok(Self { client, webhook_url: webhook_url.into(), api_token })
    }
}

#[async_trait]
impl ContactNotifier for WebhookContactNotifier {
    async fn lead_assigned(&self, worker: &Worker, lead: &Lead) -> Result<(), ApplicationError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .bearer_auth(self.api_token.expose_secret())
            .json(&LeadAssignedPayload::new(worker, lead))
            .send()
            .await
            .map_err(|error| {
                ApplicationError::Integration(format!("webhook request failed: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(ApplicationError::Integration(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

pub fn notifier_from_config(
    config: &NotifierConfig,
) -> Result<Arc<dyn ContactNotifier>, ApplicationError> {
    if !config.enabled {
        return Ok(Arc::new(NoopContactNotifier));
    }

    let webhook_url = config.webhook_url.clone().ok_or_else(|| {
        ApplicationError::Configuration("notifier.webhook_url is not configured".to_string())
    })?;
    let api_token = config.api_token.clone().ok_or_else(|| {
        ApplicationError::Configuration("notifier.api_token is not configured".to_string())
    })?;

    Ok(Arc::new(WebhookContactNotifier::new(
        webhook_url,
        api_token,
        Duration::from_secs(config.timeout_secs),
    )?))
}
