use crate::shared::usecase::UseCase;
use varsel_domain::{Booking, ReminderJob, ReminderStatePatch};
use varsel_infra::VarselContext;

/// Enqueues the delayed reminder jobs for a booking, one per configured
/// offset. Safe to run any number of times for the same booking: jobs
/// are keyed deterministically so a re-run replaces instead of
/// duplicating, and `scheduled_at` is only written the first time.
#[derive(Debug)]
pub struct ScheduleRemindersUseCase {
    pub booking: Booking,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for ScheduleRemindersUseCase {
    /// The jobs that are now pending in the queue for this booking
    type Response = Vec<ReminderJob>;

    type Error = UseCaseError;

    const NAME: &'static str = "ScheduleReminders";

    async fn execute(&mut self, ctx: &VarselContext) -> Result<Self::Response, Self::Error> {
        if !self.booking.is_eligible_for_reminders() {
            return Ok(Vec::new());
        }

        let now = ctx.sys.get_timestamp_millis();
        let mut jobs = Vec::new();

        for offset in &ctx.config.reminder_settings.offsets {
            let entry = self.booking.reminder_state.entry(&offset.label);
            if entry.sent_at.is_some() {
                // Already delivered, nothing left to schedule
                continue;
            }
            let due_at = self.booking.event_time - offset.duration_millis;
            if due_at <= now {
                // No retroactive reminders
                continue;
            }

            let job = ReminderJob::new(self.booking.id.clone(), &offset.label, due_at);
            ctx.repos
                .reminder_jobs
                .upsert(&job)
                .await
                .map_err(|_| UseCaseError::StorageError)?;

            if entry.scheduled_at.is_none() {
                ctx.repos
                    .bookings
                    .update_reminder_state(
                        &self.booking.id,
                        &offset.label,
                        &ReminderStatePatch::scheduled(now),
                    )
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
            }
            jobs.push(job);
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use crate::test_helpers::{setup_context, StaticTimeSys, HOUR};
    use std::sync::Arc;
    use varsel_domain::{BookingStatus, ID};

    fn confirmed_booking(event_time: i64) -> Booking {
        let mut booking = Booking::new(event_time, ID::new());
        booking.status = BookingStatus::Confirmed;
        booking
    }

    #[tokio::test]
    async fn schedules_one_job_per_future_offset() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let event_time = now + 30 * HOUR;
        let booking = confirmed_booking(event_time);
        ctx.repos.bookings.insert(&booking).await.unwrap();

        let jobs = execute(ScheduleRemindersUseCase { booking: booking.clone() }, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].due_at, event_time - 24 * HOUR);
        assert_eq!(jobs[1].due_at, event_time - 2 * HOUR);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").scheduled_at, Some(now));
        assert_eq!(stored.reminder_state.entry("2h").scheduled_at, Some(now));
        assert_eq!(stored.reminder_state.entry("24h").sent_at, None);
    }

    #[tokio::test]
    async fn scheduling_twice_does_not_duplicate_jobs_or_move_scheduled_at() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let booking = confirmed_booking(now + 30 * HOUR);
        ctx.repos.bookings.insert(&booking).await.unwrap();

        execute(ScheduleRemindersUseCase { booking: booking.clone() }, &ctx)
            .await
            .unwrap();

        // Second call later, e.g. from the sweep racing a lifecycle event
        ctx.sys = Arc::new(StaticTimeSys(now + HOUR));
        let booking_again = ctx.repos.bookings.find(&booking.id).await.unwrap();
        execute(ScheduleRemindersUseCase { booking: booking_again }, &ctx)
            .await
            .unwrap();

        let pending = ctx.repos.reminder_jobs.delete_due_before(i64::MAX).await;
        assert_eq!(pending.len(), 2);

        let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
        assert_eq!(stored.reminder_state.entry("24h").scheduled_at, Some(now));
        assert_eq!(stored.reminder_state.entry("2h").scheduled_at, Some(now));
    }

    #[tokio::test]
    async fn skips_offsets_whose_fire_time_has_passed() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        // Inside the 24h offset but ahead of the 2h offset
        let booking = confirmed_booking(now + 3 * HOUR);
        ctx.repos.bookings.insert(&booking).await.unwrap();

        let jobs = execute(ScheduleRemindersUseCase { booking }, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].offset_label, "2h");

        // Event already closer than every offset
        let booking = confirmed_booking(now + HOUR);
        let jobs = execute(ScheduleRemindersUseCase { booking }, &ctx)
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn ineligible_booking_schedules_nothing() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        for status in [BookingStatus::Pending, BookingStatus::Cancelled, BookingStatus::Completed] {
            let mut booking = Booking::new(now + 30 * HOUR, ID::new());
            booking.status = status;
            let jobs = execute(ScheduleRemindersUseCase { booking }, &ctx)
                .await
                .unwrap();
            assert!(jobs.is_empty());
        }
        assert!(ctx.repos.reminder_jobs.delete_due_before(i64::MAX).await.is_empty());
    }

    #[tokio::test]
    async fn already_sent_offsets_are_not_rescheduled() {
        let mut ctx = setup_context();
        let now = 100 * HOUR;
        ctx.sys = Arc::new(StaticTimeSys(now));

        let mut booking = confirmed_booking(now + 30 * HOUR);
        booking
            .reminder_state
            .apply("24h", &ReminderStatePatch::sent(now - HOUR));
        ctx.repos.bookings.insert(&booking).await.unwrap();

        let jobs = execute(ScheduleRemindersUseCase { booking }, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].offset_label, "2h");
    }
}
