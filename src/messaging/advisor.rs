//! Advisor notification adapters

use crate::runtime::{AdvisorNotifier, NotifyError};
use crate::state_machine::AdvisorId;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AdvisorNotification<'a> {
    subscriber_id: &'a str,
    advisor: &'a str,
    text: &'a str,
}

/// Posts each subscriber message to the advisor workflow system as JSON
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AdvisorNotifier for WebhookNotifier {
    async fn notify(
        &self,
        subscriber_id: &str,
        advisor: &AdvisorId,
        text: &str,
    ) -> Result<(), NotifyError> {
        let payload = AdvisorNotification {
            subscriber_id,
            advisor,
            text,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

/// Logs notifications when no workflow endpoint is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl AdvisorNotifier for LogNotifier {
    async fn notify(
        &self,
        subscriber_id: &str,
        advisor: &AdvisorId,
        text: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(subscriber = %subscriber_id, advisor = %advisor, text = %text, "Message for advisor");
        Ok(())
    }
}
