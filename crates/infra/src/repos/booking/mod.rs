mod inmemory;
mod postgres;

pub use inmemory::InMemoryBookingRepo;
pub use postgres::PostgresBookingRepo;
use varsel_domain::{Booking, ReminderStatePatch, ID};

#[async_trait::async_trait]
pub trait IBookingRepo: Send + Sync {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn find(&self, booking_id: &ID) -> Option<Booking>;
    /// Bookings eligible for reminder scheduling with an event time
    /// inside `[from, to]`. Used by the reconciliation sweep.
    async fn find_confirmed_in_window(&self, from: i64, to: i64) -> anyhow::Result<Vec<Booking>>;
    /// Targeted update of one offsets reminder state. Only the fields
    /// present in the patch are written, the rest of the booking record
    /// is left alone.
    async fn update_reminder_state(
        &self,
        booking_id: &ID,
        offset_label: &str,
        patch: &ReminderStatePatch,
    ) -> anyhow::Result<()>;
}
