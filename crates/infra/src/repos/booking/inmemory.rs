use super::IBookingRepo;
use crate::repos::shared::inmemory_repo::*;
use varsel_domain::{Booking, BookingStatus, ReminderStatePatch, ID};

pub struct InMemoryBookingRepo {
    bookings: std::sync::Mutex<Vec<Booking>>,
}

impl InMemoryBookingRepo {
    pub fn new() -> Self {
        Self {
            bookings: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IBookingRepo for InMemoryBookingRepo {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()> {
        upsert(booking, &self.bookings);
        Ok(())
    }

    async fn find(&self, booking_id: &ID) -> Option<Booking> {
        find(booking_id, &self.bookings)
    }

    async fn find_confirmed_in_window(&self, from: i64, to: i64) -> anyhow::Result<Vec<Booking>> {
        let res = find_by(&self.bookings, |booking: &Booking| {
            booking.status == BookingStatus::Confirmed
                && booking.event_time >= from
                && booking.event_time <= to
        });
        Ok(res)
    }

    async fn update_reminder_state(
        &self,
        booking_id: &ID,
        offset_label: &str,
        patch: &ReminderStatePatch,
    ) -> anyhow::Result<()> {
        update_by(
            &self.bookings,
            |booking: &Booking| booking.id == *booking_id,
            |booking| booking.reminder_state.apply(offset_label, patch),
        );
        Ok(())
    }
}
