use crate::config::EmailProviderConfig;
use crate::services::{ChannelOutcome, INotificationChannel};
use serde_json::json;
use std::sync::Arc;
use varsel_domain::{Booking, ReminderNotification};

#[async_trait::async_trait]
pub trait IEmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Sender for transactional email providers with a simple
/// `{from, to, subject, text}` HTTP API
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: EmailProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url,
            api_key: config.api_key,
            from: config.from,
        }
    }
}

#[async_trait::async_trait]
impl IEmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

enum EmailProvider {
    Configured(Arc<dyn IEmailSender>),
    Disabled,
}

/// Email delivery channel. One booking has at most one email recipient,
/// so the outcome is all-or-nothing.
pub struct EmailChannel {
    provider: EmailProvider,
}

impl EmailChannel {
    pub fn new(config: Option<EmailProviderConfig>) -> Self {
        let provider = match config {
            Some(config) => EmailProvider::Configured(Arc::new(HttpEmailSender::new(config))),
            None => EmailProvider::Disabled,
        };
        Self { provider }
    }

    pub fn with_sender(sender: Arc<dyn IEmailSender>) -> Self {
        Self {
            provider: EmailProvider::Configured(sender),
        }
    }
}

#[async_trait::async_trait]
impl INotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        booking: &Booking,
        notification: &ReminderNotification,
    ) -> ChannelOutcome {
        let sender = match &self.provider {
            EmailProvider::Configured(sender) => sender,
            EmailProvider::Disabled => return ChannelOutcome::Disabled,
        };
        let to = match &booking.recipient_email {
            Some(to) => to,
            None => return ChannelOutcome::NoTarget,
        };
        match sender.send(to, &notification.title, &notification.body).await {
            Ok(_) => ChannelOutcome::Delivered,
            Err(e) => ChannelOutcome::Failed(e.to_string()),
        }
    }
}
