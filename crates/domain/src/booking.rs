use crate::reminder::ReminderSettings;
use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Error, Debug)]
pub enum InvalidStatusError {
    #[error("Booking status: {0} is not recognized")]
    Unknown(String),
}

impl FromStr for BookingStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(InvalidStatusError::Unknown(s.to_string())),
        }
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// Delivery bookkeeping for one reminder offset of a `Booking`.
///
/// Both fields move `None -> Some` exactly once: `scheduled_at` when a
/// job is first enqueued and `sent_at` when at least one delivery
/// channel succeeded. They are never unset again, which is what makes
/// scheduling idempotent and delivery safe under queue redelivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderStateEntry {
    pub scheduled_at: Option<i64>,
    pub sent_at: Option<i64>,
}

/// Set-only patch applied to one offsets `ReminderStateEntry`.
/// Fields left as `None` are untouched, so concurrent writers never
/// clobber each other.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<i64>,
}

impl ReminderStatePatch {
    pub fn scheduled(now: i64) -> Self {
        Self {
            scheduled_at: Some(now),
            sent_at: None,
        }
    }

    pub fn sent(now: i64) -> Self {
        Self {
            scheduled_at: None,
            sent_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderState(pub HashMap<String, ReminderStateEntry>);

impl ReminderState {
    pub fn entry(&self, offset_label: &str) -> ReminderStateEntry {
        self.0.get(offset_label).cloned().unwrap_or_default()
    }

    pub fn is_sent(&self, offset_label: &str) -> bool {
        self.entry(offset_label).sent_at.is_some()
    }

    pub fn is_scheduled(&self, offset_label: &str) -> bool {
        self.entry(offset_label).scheduled_at.is_some()
    }

    pub fn apply(&mut self, offset_label: &str, patch: &ReminderStatePatch) {
        let entry = self.0.entry(offset_label.to_string()).or_default();
        if patch.scheduled_at.is_some() {
            entry.scheduled_at = patch.scheduled_at;
        }
        if patch.sent_at.is_some() {
            entry.sent_at = patch.sent_at;
        }
    }
}

/// A booking owned by the external booking store. The reminder pipeline
/// only reads it and writes targeted updates to `reminder_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: ID,
    /// The timestamp in millis that reminder offsets are computed against
    pub event_time: i64,
    /// User that should receive the reminders
    pub recipient: ID,
    /// Email address for the email channel, when the guest provided one
    pub recipient_email: Option<String>,
    pub status: BookingStatus,
    pub reminder_state: ReminderState,
}

impl Booking {
    pub fn new(event_time: i64, recipient: ID) -> Self {
        Self {
            id: Default::default(),
            event_time,
            recipient,
            recipient_email: None,
            status: BookingStatus::Pending,
            reminder_state: Default::default(),
        }
    }

    /// Only confirmed bookings are eligible for reminder scheduling
    pub fn is_eligible_for_reminders(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    /// Whether the reconciliation sweep needs to visit this booking:
    /// some offset has neither been scheduled nor already sent, and its
    /// fire time has not passed yet.
    pub fn has_unscheduled_offset(&self, settings: &ReminderSettings, now: i64) -> bool {
        settings.offsets.iter().any(|offset| {
            let entry = self.reminder_state.entry(&offset.label);
            entry.scheduled_at.is_none()
                && entry.sent_at.is_none()
                && self.event_time - offset.duration_millis > now
        })
    }
}

impl Entity<ID> for Booking {
    fn id(&self) -> ID {
        self.id.clone()
    }
}
