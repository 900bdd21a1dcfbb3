use super::IReminderJobRepo;
use sqlx::types::Uuid;
use sqlx::{FromRow, PgPool};
use varsel_domain::ReminderJob;

pub struct PostgresReminderJobRepo {
    pool: PgPool,
}

impl PostgresReminderJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderJobRaw {
    job_uid: String,
    booking_uid: Uuid,
    offset_label: String,
    due_at: i64,
    attempts: i64,
}

impl From<ReminderJobRaw> for ReminderJob {
    fn from(raw: ReminderJobRaw) -> Self {
        Self {
            job_id: raw.job_uid,
            booking_id: raw.booking_uid.into(),
            offset_label: raw.offset_label,
            due_at: raw.due_at,
            attempts: raw.attempts,
        }
    }
}

#[async_trait::async_trait]
impl IReminderJobRepo for PostgresReminderJobRepo {
    async fn upsert(&self, job: &ReminderJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminder_jobs
            (job_uid, booking_uid, offset_label, due_at, attempts)
            VALUES($1, $2, $3, $4, $5)
            ON CONFLICT (job_uid) DO UPDATE
            SET due_at = $4, attempts = $5
            "#,
        )
        .bind(&job.job_id)
        .bind(job.booking_id.inner_ref())
        .bind(&job.offset_label)
        .bind(job.due_at)
        .bind(job.attempts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, job_id: &str) -> Option<ReminderJob> {
        sqlx::query_as::<_, ReminderJobRaw>(
            r#"
            SELECT * FROM reminder_jobs AS j
            WHERE j.job_uid = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()
        .map(|job| job.into())
    }

    async fn remove(&self, job_id: &str) -> Option<ReminderJob> {
        sqlx::query_as::<_, ReminderJobRaw>(
            r#"
            DELETE FROM reminder_jobs AS j
            WHERE j.job_uid = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()
        .map(|job| job.into())
    }

    async fn delete_due_before(&self, before: i64) -> Vec<ReminderJob> {
        sqlx::query_as::<_, ReminderJobRaw>(
            r#"
            DELETE FROM reminder_jobs AS j
            WHERE j.due_at <= $1
            RETURNING *
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|job| job.into())
        .collect()
    }
}
