use super::IReminderJobRepo;
use crate::repos::shared::inmemory_repo::*;
use varsel_domain::ReminderJob;

pub struct InMemoryReminderJobRepo {
    jobs: std::sync::Mutex<Vec<ReminderJob>>,
}

impl InMemoryReminderJobRepo {
    pub fn new() -> Self {
        Self {
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderJobRepo for InMemoryReminderJobRepo {
    async fn upsert(&self, job: &ReminderJob) -> anyhow::Result<()> {
        upsert(job, &self.jobs);
        Ok(())
    }

    async fn find(&self, job_id: &str) -> Option<ReminderJob> {
        find(&job_id.to_string(), &self.jobs)
    }

    async fn remove(&self, job_id: &str) -> Option<ReminderJob> {
        delete(&job_id.to_string(), &self.jobs)
    }

    async fn delete_due_before(&self, before: i64) -> Vec<ReminderJob> {
        drain_by(&self.jobs, |job| job.due_at <= before)
    }
}
