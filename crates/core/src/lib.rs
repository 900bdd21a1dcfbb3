mod cancel_reminders;
mod job_schedulers;
mod process_reminder;
mod schedule_reminders;
mod shared;
mod sweep_reminders;
#[cfg(test)]
mod test_helpers;

pub use cancel_reminders::CancelRemindersUseCase;
pub use job_schedulers::process_due_job;
use job_schedulers::{start_reminder_sweep_job, start_reminder_worker};
pub use process_reminder::{ProcessOutcome, ProcessReminderUseCase};
pub use schedule_reminders::ScheduleRemindersUseCase;
pub use shared::usecase::{execute, UseCase};
pub use sweep_reminders::SweepRemindersUseCase;

use varsel_domain::{Booking, ReminderJob, ID};
use varsel_infra::VarselContext;

/// Schedule the reminder jobs for a booking. Invoked from booking
/// lifecycle transitions (created/confirmed) and by the sweep;
/// idempotent, so both paths can race freely.
pub async fn schedule_reminders(
    booking: Booking,
    ctx: &VarselContext,
) -> anyhow::Result<Vec<ReminderJob>> {
    execute(ScheduleRemindersUseCase { booking }, ctx)
        .await
        .map_err(|e| anyhow::anyhow!("Unable to schedule reminders: {:?}", e))
}

/// Remove the pending reminder jobs for a booking, e.g. on
/// cancellation. Returns the number of jobs removed.
pub async fn cancel_reminders(booking_id: ID, ctx: &VarselContext) -> usize {
    // The usecase has no failure mode, missing jobs are ignored
    execute(CancelRemindersUseCase { booking_id }, ctx)
        .await
        .unwrap_or(0)
}

/// The reminder pipeline daemon: the queue worker draining due jobs and
/// the periodic reconciliation sweep.
pub struct Application {
    context: VarselContext,
}

impl Application {
    pub fn new(context: VarselContext) -> Self {
        Self { context }
    }

    pub fn start(self) {
        start_reminder_worker(self.context.clone());
        start_reminder_sweep_job(self.context);
    }
}
