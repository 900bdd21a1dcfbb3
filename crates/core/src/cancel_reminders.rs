use crate::shared::usecase::UseCase;
use varsel_domain::{ReminderJob, ID};
use varsel_infra::VarselContext;

/// Removes the pending reminder jobs for a booking, typically because
/// the booking was voided. Only prevents future firing: reminder state
/// for offsets that were already sent is left as history, and a job
/// that a worker has already claimed may still fire once. The
/// dispatcher treats that firing as a no-op since the booking is no
/// longer confirmed.
#[derive(Debug)]
pub struct CancelRemindersUseCase {
    pub booking_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {}

#[async_trait::async_trait]
impl UseCase for CancelRemindersUseCase {
    /// Number of jobs that were actually removed from the queue
    type Response = usize;

    type Error = UseCaseError;

    const NAME: &'static str = "CancelReminders";

    async fn execute(&mut self, ctx: &VarselContext) -> Result<Self::Response, Self::Error> {
        let mut removed = 0;
        for offset in &ctx.config.reminder_settings.offsets {
            let job_id = ReminderJob::id_for(&self.booking_id, &offset.label);
            // A missing job already fired or was never scheduled
            if ctx.repos.reminder_jobs.remove(&job_id).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
