use std::sync::atomic::{AtomicUsize, Ordering};
use varsel_domain::{Booking, ReminderNotification};
use varsel_infra::{ChannelOutcome, INotificationChannel, ISys, VarselContext};

pub const HOUR: i64 = 1000 * 60 * 60;

pub struct StaticTimeSys(pub i64);
impl ISys for StaticTimeSys {
    fn get_timestamp_millis(&self) -> i64 {
        self.0
    }
}

pub fn setup_context() -> VarselContext {
    VarselContext::create_inmemory()
}

/// Delivery channel fake that counts its sends and answers with a fixed
/// outcome
pub struct RecordingChannel {
    outcome: ChannelOutcome,
    sends: AtomicUsize,
}

impl RecordingChannel {
    pub fn with_outcome(outcome: ChannelOutcome) -> Self {
        Self {
            outcome,
            sends: AtomicUsize::new(0),
        }
    }

    pub fn delivering() -> Self {
        Self::with_outcome(ChannelOutcome::Delivered)
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_outcome(ChannelOutcome::Failed(reason.to_string()))
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl INotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(
        &self,
        _booking: &Booking,
        _notification: &ReminderNotification,
    ) -> ChannelOutcome {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
