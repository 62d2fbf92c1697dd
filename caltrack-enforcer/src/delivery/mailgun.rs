//! Mailgun HTTP API transport
//!
//! API documentation: https://documentation.mailgun.com/docs/mailgun/api-reference/

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::{DeliveryChannel, Message};
use caltrack_common::config::DeliveryConfig;

/// Sends plain-text mail through `POST {base_url}/{domain}/messages`
pub struct MailgunChannel {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl MailgunChannel {
    /// Build a channel whose every request is bounded by
    /// `config.timeout_secs`
    pub fn new(config: &DeliveryConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}/messages",
                config.mailgun_base_url.trim_end_matches('/'),
                config.mailgun_domain
            ),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryChannel for MailgunChannel {
    async fn send(&self, sender: &str, message: &Message) -> bool {
        let to = message.recipients.join(", ");
        let form = [
            ("from", sender),
            ("to", to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.body.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(to = %to, subject = %message.subject, "Mailgun accepted message");
                true
            }
            Ok(resp) => {
                warn!(status = %resp.status(), to = %to, "Mailgun rejected message");
                false
            }
            Err(e) if e.is_timeout() => {
                warn!(to = %to, "Mailgun request timed out");
                false
            }
            Err(e) => {
                warn!(to = %to, "Mailgun request failed: {}", e);
                false
            }
        }
    }
}
