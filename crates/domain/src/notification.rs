use crate::booking::Booking;
use crate::shared::entity::ID;
use chrono::TimeZone;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Structured data attached to every reminder so that clients can
/// navigate to the booking the reminder refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderNotificationData {
    pub booking_id: ID,
    pub offset_label: String,
    pub event_time: i64,
}

/// Channel-agnostic reminder payload. Each delivery channel renders
/// this into its own message format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub title: String,
    pub body: String,
    pub data: ReminderNotificationData,
    pub click_target: String,
}

impl ReminderNotification {
    /// Build the reminder for one (booking, offset) pair, formatting
    /// the event time in the configured display timezone.
    pub fn for_booking(booking: &Booking, offset_label: &str, tz: Tz, click_base_url: &str) -> Self {
        let event_time = tz.timestamp_millis(booking.event_time);
        let body = format!(
            "Your booking starts {} at {}",
            event_time.format("%A %-d %B"),
            event_time.format("%H:%M"),
        );
        Self {
            title: "Booking reminder".to_string(),
            body,
            data: ReminderNotificationData {
                booking_id: booking.id.clone(),
                offset_label: offset_label.to_string(),
                event_time: booking.event_time,
            },
            click_target: format!("{}/bookings/{}", click_base_url, booking.id),
        }
    }
}
