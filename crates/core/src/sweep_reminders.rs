use crate::schedule_reminders::ScheduleRemindersUseCase;
use crate::shared::usecase::{execute, UseCase};
use tracing::error;
use varsel_infra::VarselContext;

/// The reconciliation sweep: finds confirmed bookings inside the
/// lookahead window that still have an unscheduled offset and schedules
/// them. This is the recovery path after a crash between booking
/// confirmation and enqueue, and after queue data loss. Scheduling is
/// idempotent, so running concurrently with event-driven scheduling is
/// safe.
#[derive(Debug)]
pub struct SweepRemindersUseCase;

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for SweepRemindersUseCase {
    /// Number of bookings the sweep scheduled reminders for
    type Response = usize;

    type Error = UseCaseError;

    const NAME: &'static str = "SweepReminders";

    async fn execute(&mut self, ctx: &VarselContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let settings = &ctx.config.reminder_settings;

        let bookings = ctx
            .repos
            .bookings
            .find_confirmed_in_window(now, now + settings.lookahead_millis)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut scheduled_bookings = 0;
        for booking in bookings {
            if !booking.has_unscheduled_offset(settings, now) {
                continue;
            }
            let booking_id = booking.id.clone();
            match execute(ScheduleRemindersUseCase { booking }, ctx).await {
                Ok(_) => scheduled_bookings += 1,
                // Skip and pick the booking up again on the next sweep
                Err(e) => error!(
                    "Sweep was unable to schedule reminders for booking: {}. Err: {:?}",
                    booking_id, e
                ),
            }
        }
        Ok(scheduled_bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{setup_context, StaticTimeSys, HOUR};
    use std::sync::Arc;
    use varsel_domain::{Booking, BookingStatus, ReminderStatePatch, ID};

    async fn insert_booking(
        ctx: &varsel_infra::VarselContext,
        event_time: i64,
        status: BookingStatus,
    ) -> Booking {
        let mut booking = Booking::new(event_time, ID::new());
        booking.status = status;
        ctx.repos.bookings.insert(&booking).await.unwrap();
        booking
    }

    #[tokio::test]
    async fn schedules_unscheduled_bookings_inside_the_window() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let inside = insert_booking(&ctx, now + 30 * HOUR, BookingStatus::Confirmed).await;
        // Outside the 48h lookahead
        insert_booking(&ctx, now + 80 * HOUR, BookingStatus::Confirmed).await;
        // Not confirmed
        insert_booking(&ctx, now + 30 * HOUR, BookingStatus::Pending).await;

        let scheduled = execute(SweepRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(scheduled, 1);

        let pending = ctx.repos.reminder_jobs.delete_due_before(i64::MAX).await;
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|job| job.booking_id == inside.id));

        let stored = ctx.repos.bookings.find(&inside.id).await.unwrap();
        assert!(stored.reminder_state.is_scheduled("24h"));
        assert!(stored.reminder_state.is_scheduled("2h"));
    }

    #[tokio::test]
    async fn already_scheduled_bookings_are_untouched() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let booking = insert_booking(&ctx, now + 30 * HOUR, BookingStatus::Confirmed).await;
        execute(
            crate::schedule_reminders::ScheduleRemindersUseCase { booking: booking.clone() },
            &ctx,
        )
        .await
        .unwrap();

        let scheduled = execute(SweepRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(scheduled, 0);

        // No duplicate jobs appeared
        let pending = ctx.repos.reminder_jobs.delete_due_before(i64::MAX).await;
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn sent_offsets_do_not_retrigger_the_sweep() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let mut booking = Booking::new(now + HOUR + HOUR / 2, ID::new());
        booking.status = BookingStatus::Confirmed;
        // 24h reminder already delivered, 2h fire time already past
        booking
            .reminder_state
            .apply("24h", &ReminderStatePatch::sent(now - 23 * HOUR));
        ctx.repos.bookings.insert(&booking).await.unwrap();

        let scheduled = execute(SweepRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(scheduled, 0);
    }
}
