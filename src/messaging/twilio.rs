//! Twilio WhatsApp transport

use crate::runtime::{MessageSender, SendError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const CHANNEL_PREFIX: &str = "whatsapp:";

/// Account credentials and the business number messages are sent from
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_number: String,
}

/// Sends replies through the Twilio Messages API
pub struct TwilioSender {
    client: Client,
    credentials: TwilioCredentials,
    base_url: String,
}

impl TwilioSender {
    pub fn new(credentials: TwilioCredentials) -> Result<Self, reqwest::Error> {
        Self::with_base_url(credentials, TWILIO_API_BASE)
    }

    /// Point at a different API host (used by tests)
    pub fn with_base_url(
        mut credentials: TwilioCredentials,
        base_url: &str,
    ) -> Result<Self, reqwest::Error> {
        // The number may be configured with or without the channel prefix
        if let Some(bare) = credentials.whatsapp_number.strip_prefix(CHANNEL_PREFIX) {
            credentials.whatsapp_number = bare.trim().to_string();
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), SendError> {
        let from = format!("{CHANNEL_PREFIX}{}", self.credentials.whatsapp_number);
        let to = format!("{CHANNEL_PREFIX}{subscriber_id}");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", text)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Network(format!("Request timeout: {e}"))
                } else {
                    SendError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected(format!("HTTP {status}: {body}")));
        }

        tracing::debug!(subscriber = %subscriber_id, "Message accepted by Twilio");
        Ok(())
    }
}
