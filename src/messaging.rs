//! Production transports for outbound messages and advisor notifications
//!
//! Each collaborator has a real HTTP adapter and a log-only fallback used
//! when its credentials are not configured.

mod advisor;
mod twilio;

pub use advisor::{LogNotifier, WebhookNotifier};
pub use twilio::{TwilioCredentials, TwilioSender};

use crate::runtime::{MessageSender, SendError};
use async_trait::async_trait;

/// Logs outbound messages instead of delivering them
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), SendError> {
        tracing::info!(subscriber = %subscriber_id, text = %text, "Outbound message (not delivered)");
        Ok(())
    }
}
