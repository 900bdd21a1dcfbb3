mod email;
mod push;

pub use email::{EmailChannel, HttpEmailSender, IEmailSender};
pub use push::{FcmClient, IPushProvider, PushChannel, PushSendResult};

use std::sync::Arc;
use varsel_domain::{Booking, ReminderNotification};

/// Outcome of one channels attempt at delivering a reminder. Channel
/// errors never propagate as `Err`, they are encoded here so that the
/// dispatcher can fan out without one channel aborting the others.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    /// The channel reached the recipient on at least one target
    Delivered,
    /// The recipient has no target on this channel (no active tokens,
    /// no email address). Not an error.
    NoTarget,
    /// The channel has no provider configured
    Disabled,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[async_trait::async_trait]
pub trait INotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, booking: &Booking, notification: &ReminderNotification)
        -> ChannelOutcome;
}

/// The set of delivery channels a reminder fans out to. Built once at
/// context setup and injected, so tests can substitute fakes without
/// global state.
#[derive(Clone)]
pub struct Notifier {
    pub channels: Vec<Arc<dyn INotificationChannel>>,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn INotificationChannel>>) -> Self {
        Self { channels }
    }
}
