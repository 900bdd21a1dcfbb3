use crate::process_reminder::ProcessReminderUseCase;
use crate::shared::usecase::execute;
use crate::sweep_reminders::SweepRemindersUseCase;
use std::time::Duration;
use tokio::time::interval;
use tracing::error;
use varsel_domain::ReminderJob;
use varsel_infra::VarselContext;

/// Runs the reconciliation sweep once at startup and then on a fixed
/// interval.
pub fn start_reminder_sweep_job(ctx: VarselContext) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(ctx.config.sweep_interval_secs));
        loop {
            // The first tick completes immediately, which gives the
            // startup sweep
            interval.tick().await;
            let _ = execute(SweepRemindersUseCase, &ctx).await;
        }
    });
}

/// The queue worker loop: claims due reminder jobs and processes each
/// one on its own task, so one slow delivery never delays the rest of
/// the batch.
pub fn start_reminder_worker(ctx: VarselContext) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(ctx.config.queue_poll_interval_secs));
        loop {
            interval.tick().await;
            let due_jobs = ctx
                .repos
                .reminder_jobs
                .delete_due_before(ctx.sys.get_timestamp_millis())
                .await;
            for job in due_jobs {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    process_due_job(job, &ctx).await;
                });
            }
        }
    });
}

/// Process one claimed job, re-enqueueing it with exponential backoff
/// when every delivery channel failed, until the attempt ceiling is
/// reached.
pub async fn process_due_job(job: ReminderJob, ctx: &VarselContext) {
    let res = execute(ProcessReminderUseCase { job: job.clone() }, ctx).await;
    if res.is_ok() {
        return;
    }

    let policy = &ctx.config.retry_policy;
    let failed_attempts = job.attempts + 1;
    if failed_attempts >= policy.max_attempts {
        // The unset sent_at on the booking is the permanent record of
        // this failure
        error!(
            "Reminder job {} abandoned after {} failed attempts",
            job.job_id, failed_attempts
        );
        return;
    }

    let mut retry = job;
    retry.due_at =
        ctx.sys.get_timestamp_millis() + policy.backoff_delay_millis(retry.attempts);
    retry.attempts = failed_attempts;
    if let Err(e) = ctx.repos.reminder_jobs.upsert(&retry).await {
        error!(
            "Unable to re-enqueue reminder job {} for retry. Err: {:?}",
            retry.job_id, e
        );
    }
}
