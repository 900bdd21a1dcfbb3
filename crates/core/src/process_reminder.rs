use crate::shared::usecase::UseCase;
use futures::future;
use tracing::{error, warn};
use varsel_domain::{ReminderJob, ReminderNotification, ReminderStatePatch};
use varsel_infra::{ChannelOutcome, VarselContext};

/// The delivery dispatcher: invoked by the queue worker when a reminder
/// job becomes due. Fans the reminder out to every delivery channel
/// concurrently and records `sent_at` when at least one succeeded.
///
/// Written to be safe under at-least-once redelivery and under the
/// cancel race: a booking that is no longer confirmed, or an offset
/// that was already sent, completes as a no-op instead of reaching the
/// recipient twice.
#[derive(Debug)]
pub struct ProcessReminderUseCase {
    pub job: ReminderJob,
}

#[derive(Debug, PartialEq)]
pub enum ProcessOutcome {
    /// Redelivery or cancellation race, nothing was sent
    Skipped,
    /// At least one channel reached the recipient
    Delivered,
    /// No channel was applicable (all disabled or without a target).
    /// The job completes, the unset `sent_at` is the permanent record.
    Inapplicable,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    /// Every applicable channel failed, the queue should retry
    AllChannelsFailed,
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for ProcessReminderUseCase {
    type Response = ProcessOutcome;

    type Error = UseCaseError;

    const NAME: &'static str = "ProcessReminder";

    async fn execute(&mut self, ctx: &VarselContext) -> Result<Self::Response, Self::Error> {
        let booking = match ctx.repos.bookings.find(&self.job.booking_id).await {
            Some(booking) => booking,
            // Deleted bookings have no reminders to deliver
            None => return Ok(ProcessOutcome::Skipped),
        };

        if !booking.is_eligible_for_reminders()
            || booking.reminder_state.is_sent(&self.job.offset_label)
        {
            return Ok(ProcessOutcome::Skipped);
        }

        let notification = ReminderNotification::for_booking(
            &booking,
            &self.job.offset_label,
            ctx.config.display_timezone,
            &ctx.config.click_target_base_url,
        );

        // Concurrent fan-out. Channels never return Err, so one failing
        // or slow channel cannot abort the others; the job waits for
        // all outcomes before deciding.
        let sends = ctx.notifier.channels.iter().map(|channel| {
            let booking = &booking;
            let notification = &notification;
            async move { (channel.name(), channel.send(booking, notification).await) }
        });
        let outcomes = future::join_all(sends).await;

        for (channel, outcome) in &outcomes {
            if let ChannelOutcome::Failed(reason) = outcome {
                error!(
                    "Reminder {} delivery via {} channel failed: {}",
                    self.job.job_id, channel, reason
                );
            }
        }

        if outcomes.iter().any(|(_, outcome)| outcome.is_delivered()) {
            ctx.repos
                .bookings
                .update_reminder_state(
                    &booking.id,
                    &self.job.offset_label,
                    &ReminderStatePatch::sent(ctx.sys.get_timestamp_millis()),
                )
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            return Ok(ProcessOutcome::Delivered);
        }

        if outcomes.iter().any(|(_, outcome)| outcome.is_failure()) {
            return Err(UseCaseError::AllChannelsFailed);
        }

        warn!(
            "Reminder {} had no applicable delivery channel, completing without delivery",
            self.job.job_id
        );
        Ok(ProcessOutcome::Inapplicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use crate::test_helpers::{setup_context, RecordingChannel, StaticTimeSys, HOUR};
    use std::sync::Arc;
    use varsel_domain::{Booking, BookingStatus, ID};
    use varsel_infra::Notifier;

    fn due_job(booking: &Booking, offset_label: &str) -> ReminderJob {
        ReminderJob::new(booking.id.clone(), offset_label, booking.event_time)
    }

    async fn insert_confirmed_booking(ctx: &varsel_infra::VarselContext, event_time: i64) -> Booking {
        let mut booking = Booking::new(event_time, ID::new());
        booking.status = BookingStatus::Confirmed;
        ctx.repos.bookings.insert(&booking).await.unwrap();
        booking
    }

    #[tokio::test]
    async fn delivers_once_and_skips_redelivery() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));
        let channel = Arc::new(RecordingChannel::delivering());
        ctx.notifier = Notifier::new(vec![channel.clone()]);

        let booking = insert_confirmed_booking(&ctx, now + 24 * HOUR).await;

        let outcome = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Delivered);
        assert_eq!(channel.sends(), 1);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").sent_at, Some(now));

        // The queue redelivers the same job
        let outcome = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Skipped);
        assert_eq!(channel.sends(), 1);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").sent_at, Some(now));
    }

    #[tokio::test]
    async fn reminder_for_cancelled_booking_is_a_noop() {
        let mut ctx = setup_context();
        let channel = Arc::new(RecordingChannel::delivering());
        ctx.notifier = Notifier::new(vec![channel.clone()]);

        let mut booking = Booking::new(24 * HOUR, ID::new());
        booking.status = BookingStatus::Cancelled;
        ctx.repos.bookings.insert(&booking).await.unwrap();

        let outcome = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Skipped);
        assert_eq!(channel.sends(), 0);
    }

    #[tokio::test]
    async fn one_channel_succeeding_is_enough() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));
        let failing = Arc::new(RecordingChannel::failing("timeout"));
        let delivering = Arc::new(RecordingChannel::delivering());
        ctx.notifier = Notifier::new(vec![failing.clone(), delivering.clone()]);

        let booking = insert_confirmed_booking(&ctx, now + 24 * HOUR).await;

        let outcome = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Delivered);
        assert_eq!(failing.sends(), 1);
        assert_eq!(delivering.sends(), 1);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").sent_at, Some(now));
    }

    #[tokio::test]
    async fn all_channels_failing_requests_a_retry() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));
        ctx.notifier = Notifier::new(vec![
            Arc::new(RecordingChannel::failing("timeout")),
            Arc::new(RecordingChannel::failing("unreachable")),
        ]);

        let booking = insert_confirmed_booking(&ctx, now + 24 * HOUR).await;

        let res = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx).await;
        assert_eq!(res, Err(UseCaseError::AllChannelsFailed));

        // sent_at stays unset so the retry attempts delivery again
        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").sent_at, None);
    }

    #[tokio::test]
    async fn no_applicable_channel_completes_without_delivery() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));
        ctx.notifier = Notifier::new(vec![
            Arc::new(RecordingChannel::with_outcome(ChannelOutcome::Disabled)),
            Arc::new(RecordingChannel::with_outcome(ChannelOutcome::NoTarget)),
        ]);

        let booking = insert_confirmed_booking(&ctx, now + 24 * HOUR).await;

        let outcome = execute(ProcessReminderUseCase { job: due_job(&booking, "24h") }, &ctx)
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Inapplicable);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").sent_at, None);
    }
}
