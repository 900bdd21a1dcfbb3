use crate::repos::IDeviceTokenRepo;
use crate::services::{ChannelOutcome, INotificationChannel};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use varsel_domain::{Booking, ReminderNotification};

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";
const FCM_TOPIC_BATCH_ADD_URL: &str = "https://iid.googleapis.com/iid/v1:batchAdd";
const FCM_TOPIC_BATCH_REMOVE_URL: &str = "https://iid.googleapis.com/iid/v1:batchRemove";

/// Per-token outcome of a multicast push send
#[derive(Debug, Clone, PartialEq)]
pub enum PushSendResult {
    Delivered,
    /// The provider rejected the token as permanently invalid, it
    /// should not be sent to again
    Invalid,
    /// Transient provider error, the token stays active
    Failed(String),
}

#[async_trait::async_trait]
pub trait IPushProvider: Send + Sync {
    /// One multicast send across all tokens, returning an outcome per
    /// token in the same order
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &ReminderNotification,
    ) -> anyhow::Result<Vec<PushSendResult>>;
    async fn send_to_topic(
        &self,
        topic: &str,
        notification: &ReminderNotification,
    ) -> anyhow::Result<()>;
    async fn subscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()>;
    async fn unsubscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()>;
}

/// Client for the FCM legacy HTTP API
pub struct FcmClient {
    client: reqwest::Client,
    server_key: String,
}

impl FcmClient {
    pub fn new(server_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_key,
        }
    }

    fn auth_header(&self) -> String {
        format!("key={}", self.server_key)
    }

    fn message_json(notification: &ReminderNotification) -> serde_json::Value {
        json!({
            "notification": {
                "title": notification.title,
                "body": notification.body,
                "click_action": notification.click_target,
            },
            "data": notification.data,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FcmSendResponse {
    success: i64,
    failure: i64,
    results: Vec<FcmSendResult>,
}

#[derive(Debug, Deserialize)]
struct FcmSendResult {
    message_id: Option<String>,
    error: Option<String>,
}

/// The two error classes FCM uses for endpoints that will never work
/// again. Everything else is treated as transient.
fn is_permanent_token_error(error: &str) -> bool {
    matches!(error, "NotRegistered" | "InvalidRegistration")
}

fn to_send_results(response: FcmSendResponse) -> Vec<PushSendResult> {
    response
        .results
        .into_iter()
        .map(|result| match result.error {
            None => PushSendResult::Delivered,
            Some(error) if is_permanent_token_error(&error) => PushSendResult::Invalid,
            Some(error) => PushSendResult::Failed(error),
        })
        .collect()
}

#[async_trait::async_trait]
impl IPushProvider for FcmClient {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &ReminderNotification,
    ) -> anyhow::Result<Vec<PushSendResult>> {
        let mut body = Self::message_json(notification);
        body["registration_ids"] = json!(tokens);

        let response = self
            .client
            .post(FCM_SEND_URL)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<FcmSendResponse>()
            .await?;

        if response.failure > 0 {
            info!(
                "FCM multicast send: {} delivered, {} failed",
                response.success, response.failure
            );
        }
        Ok(to_send_results(response))
    }

    async fn send_to_topic(
        &self,
        topic: &str,
        notification: &ReminderNotification,
    ) -> anyhow::Result<()> {
        let mut body = Self::message_json(notification);
        body["to"] = json!(format!("/topics/{}", topic));

        self.client
            .post(FCM_SEND_URL)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()> {
        self.batch_topic_operation(FCM_TOPIC_BATCH_ADD_URL, topic, tokens)
            .await
    }

    async fn unsubscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()> {
        self.batch_topic_operation(FCM_TOPIC_BATCH_REMOVE_URL, topic, tokens)
            .await
    }
}

impl FcmClient {
    async fn batch_topic_operation(
        &self,
        url: &str,
        topic: &str,
        tokens: &[String],
    ) -> anyhow::Result<()> {
        self.client
            .post(url)
            .header("Authorization", self.auth_header())
            .json(&json!({
                "to": format!("/topics/{}", topic),
                "registration_tokens": tokens,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Push capability decided once at construction. When no server key is
/// configured the channel degrades to a structured `Disabled` outcome
/// instead of failing the whole dispatch.
pub enum PushProvider {
    Configured(Arc<dyn IPushProvider>),
    Disabled,
}

pub struct PushChannel {
    provider: PushProvider,
    device_tokens: Arc<dyn IDeviceTokenRepo>,
}

impl PushChannel {
    pub fn new(fcm_server_key: Option<String>, device_tokens: Arc<dyn IDeviceTokenRepo>) -> Self {
        let provider = match fcm_server_key {
            Some(server_key) => PushProvider::Configured(Arc::new(FcmClient::new(server_key))),
            None => PushProvider::Disabled,
        };
        Self {
            provider,
            device_tokens,
        }
    }

    pub fn with_provider(
        provider: Arc<dyn IPushProvider>,
        device_tokens: Arc<dyn IDeviceTokenRepo>,
    ) -> Self {
        Self {
            provider: PushProvider::Configured(provider),
            device_tokens,
        }
    }

    /// Broadcast to every device subscribed to a provider-side topic
    pub async fn send_to_topic(
        &self,
        topic: &str,
        notification: &ReminderNotification,
    ) -> ChannelOutcome {
        match &self.provider {
            PushProvider::Disabled => ChannelOutcome::Disabled,
            PushProvider::Configured(provider) => {
                match provider.send_to_topic(topic, notification).await {
                    Ok(_) => ChannelOutcome::Delivered,
                    Err(e) => ChannelOutcome::Failed(e.to_string()),
                }
            }
        }
    }

    pub async fn subscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()> {
        match &self.provider {
            PushProvider::Disabled => Ok(()),
            PushProvider::Configured(provider) => provider.subscribe(topic, tokens).await,
        }
    }

    pub async fn unsubscribe(&self, topic: &str, tokens: &[String]) -> anyhow::Result<()> {
        match &self.provider {
            PushProvider::Disabled => Ok(()),
            PushProvider::Configured(provider) => provider.unsubscribe(topic, tokens).await,
        }
    }
}

#[async_trait::async_trait]
impl INotificationChannel for PushChannel {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn send(
        &self,
        booking: &Booking,
        notification: &ReminderNotification,
    ) -> ChannelOutcome {
        let provider = match &self.provider {
            PushProvider::Configured(provider) => provider,
            PushProvider::Disabled => return ChannelOutcome::Disabled,
        };

        let device_tokens = match self.device_tokens.list_active(&booking.recipient).await {
            Ok(device_tokens) => device_tokens,
            Err(e) => return ChannelOutcome::Failed(e.to_string()),
        };
        if device_tokens.is_empty() {
            return ChannelOutcome::NoTarget;
        }
        let tokens = device_tokens
            .iter()
            .map(|device_token| device_token.token.clone())
            .collect::<Vec<_>>();

        let results = match provider.send_multicast(&tokens, notification).await {
            Ok(results) => results,
            Err(e) => return ChannelOutcome::Failed(e.to_string()),
        };

        // Tokens the provider reports as permanently invalid are pruned
        // here, as a side effect of the send. This keeps the registry
        // from growing without bound and from futile resends.
        let invalid_tokens = tokens
            .iter()
            .zip(results.iter())
            .filter(|(_, result)| **result == PushSendResult::Invalid)
            .map(|(token, _)| token.clone())
            .collect::<Vec<_>>();
        if !invalid_tokens.is_empty() {
            warn!(
                "Deactivating {} invalid push tokens for recipient: {}",
                invalid_tokens.len(),
                booking.recipient
            );
            if let Err(e) = self.device_tokens.deactivate(&invalid_tokens).await {
                error!("Unable to deactivate invalid push tokens: {:?}", e);
            }
        }

        let delivered = results
            .iter()
            .filter(|result| **result == PushSendResult::Delivered)
            .count();
        if delivered > 0 {
            ChannelOutcome::Delivered
        } else {
            ChannelOutcome::Failed(format!("All {} token sends failed", tokens.len()))
        }
    }
}
