//! Outbound delivery channels
//!
//! A channel reports success as a plain `bool`. Transport errors, non-2xx
//! responses and timeouts all come back as `false`; nothing here returns an
//! error to the enforcement loop.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

mod mailgun;

pub use mailgun::MailgunChannel;

/// A composed notification ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send `message` from `sender`; `true` when the transport accepted it
    async fn send(&self, sender: &str, message: &Message) -> bool;
}

/// Channel used when no transport is configured; every attempt fails
/// (and is still audited)
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChannel;

#[async_trait]
impl DeliveryChannel for DisabledChannel {
    async fn send(&self, sender: &str, message: &Message) -> bool {
        warn!(
            sender,
            subject = %message.subject,
            "Email delivery not configured; message not sent"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_channel_never_sends() {
        let message = Message {
            recipients: vec!["qa@acme.test".to_string()],
            subject: "subject".to_string(),
            body: "body".to_string(),
        };
        assert!(!DisabledChannel.send("cal@acme.gp3.app", &message).await);
    }
}
