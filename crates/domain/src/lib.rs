mod booking;
mod device_token;
mod notification;
mod reminder;
mod shared;

pub use booking::{
    Booking, BookingStatus, InvalidStatusError, ReminderState, ReminderStateEntry,
    ReminderStatePatch,
};
pub use device_token::{DeviceToken, InvalidPlatformError, Platform};
pub use notification::{ReminderNotification, ReminderNotificationData};
pub use reminder::{
    InvalidOffsetError, ReminderJob, ReminderOffset, ReminderSettings, RetryPolicy,
};
pub use shared::entity::{Entity, ID};
