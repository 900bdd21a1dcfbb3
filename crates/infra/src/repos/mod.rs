mod booking;
mod device_token;
mod reminder_job;
mod shared;

use booking::{InMemoryBookingRepo, PostgresBookingRepo};
use device_token::{InMemoryDeviceTokenRepo, PostgresDeviceTokenRepo};
use reminder_job::{InMemoryReminderJobRepo, PostgresReminderJobRepo};
use sqlx::PgPool;
use std::sync::Arc;

pub use booking::IBookingRepo;
pub use device_token::IDeviceTokenRepo;
pub use reminder_job::IReminderJobRepo;

#[derive(Clone)]
pub struct Repos {
    pub bookings: Arc<dyn IBookingRepo>,
    pub device_tokens: Arc<dyn IDeviceTokenRepo>,
    pub reminder_jobs: Arc<dyn IReminderJobRepo>,
}

impl Repos {
    pub fn create_postgres(pool: PgPool) -> Self {
        Self {
            bookings: Arc::new(PostgresBookingRepo::new(pool.clone())),
            device_tokens: Arc::new(PostgresDeviceTokenRepo::new(pool.clone())),
            reminder_jobs: Arc::new(PostgresReminderJobRepo::new(pool)),
        }
    }

    pub fn create_inmemory() -> Self {
        Self {
            bookings: Arc::new(InMemoryBookingRepo::new()),
            device_tokens: Arc::new(InMemoryDeviceTokenRepo::new()),
            reminder_jobs: Arc::new(InMemoryReminderJobRepo::new()),
        }
    }
}
