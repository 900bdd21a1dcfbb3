mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderJobRepo;
pub use postgres::PostgresReminderJobRepo;
use varsel_domain::ReminderJob;

/// The durable delayed job queue consumed by the reminder scheduler.
///
/// Jobs are keyed by their deterministic id, so `upsert` gives
/// enqueue-or-replace semantics and the same (booking, offset) pair can
/// never be queued twice. `delete_due_before` both claims and removes
/// due jobs in one step; a claim lost to a crash is repaired by the
/// reconciliation sweep, and processing is written to be redelivery
/// safe, so the overall contract is at-least-once.
#[async_trait::async_trait]
pub trait IReminderJobRepo: Send + Sync {
    async fn upsert(&self, job: &ReminderJob) -> anyhow::Result<()>;
    async fn find(&self, job_id: &str) -> Option<ReminderJob>;
    /// Remove a job by key before it becomes due. Returns the removed
    /// job, or `None` if it already fired or never existed.
    async fn remove(&self, job_id: &str) -> Option<ReminderJob>;
    /// Claim every job that is due at `before`
    async fn delete_due_before(&self, before: i64) -> Vec<ReminderJob>;
}
