use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A named lead time before a `Booking`s event time at which a reminder
/// should fire, e.g. `24h` or `2h`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOffset {
    /// Stable label used as the key into a `Booking`s reminder state
    /// and as part of the deterministic job id, e.g. "24h"
    pub label: String,
    /// How long before the event time the reminder fires
    pub duration_millis: i64,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidOffsetError {
    #[error("Reminder offset: {0} is malformed, expected e.g. 24h, 30m or 7d")]
    Malformed(String),
}

impl FromStr for ReminderOffset {
    type Err = InvalidOffsetError;

    /// Parses offsets of the form `<amount><unit>` where unit is one
    /// of `m` (minutes), `h` (hours), `d` (days) or `w` (weeks).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(InvalidOffsetError::Malformed(s.to_string()));
        }
        let (amount, unit) = s.split_at(s.len() - 1);
        let amount = amount
            .parse::<i64>()
            .map_err(|_| InvalidOffsetError::Malformed(s.to_string()))?;
        if amount <= 0 {
            return Err(InvalidOffsetError::Malformed(s.to_string()));
        }
        let unit_millis = match unit {
            "m" => 1000 * 60,
            "h" => 1000 * 60 * 60,
            "d" => 1000 * 60 * 60 * 24,
            "w" => 1000 * 60 * 60 * 24 * 7,
            _ => return Err(InvalidOffsetError::Malformed(s.to_string())),
        };
        Ok(Self {
            label: s.to_string(),
            duration_millis: amount * unit_millis,
        })
    }
}

/// The ordered list of offsets a booking gets reminders for, together
/// with the lookahead window used by the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub offsets: Vec<ReminderOffset>,
    pub lookahead_millis: i64,
}

impl ReminderSettings {
    /// The lookahead window is clamped to at least the largest offset,
    /// otherwise the sweep could never repair the earliest reminder.
    pub fn new(offsets: Vec<ReminderOffset>, lookahead_millis: i64) -> Self {
        let max_offset = offsets
            .iter()
            .map(|o| o.duration_millis)
            .max()
            .unwrap_or(0);
        Self {
            offsets,
            lookahead_millis: lookahead_millis.max(max_offset),
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        let offsets = vec![
            "24h".parse::<ReminderOffset>().unwrap(),
            "2h".parse::<ReminderOffset>().unwrap(),
        ];
        Self::new(offsets, 1000 * 60 * 60 * 48)
    }
}

/// A scheduled unit of work in the delayed job queue: deliver the
/// reminder for one (booking, offset) pair at `due_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderJob {
    /// Deterministic identity derived from the booking id and offset
    /// label, so re-scheduling replaces instead of duplicating
    pub job_id: String,
    pub booking_id: ID,
    pub offset_label: String,
    /// Absolute timestamp in millis at which this job becomes due
    pub due_at: i64,
    /// Number of processing attempts that have already failed
    pub attempts: i64,
}

impl ReminderJob {
    pub fn new(booking_id: ID, offset_label: &str, due_at: i64) -> Self {
        Self {
            job_id: Self::id_for(&booking_id, offset_label),
            booking_id,
            offset_label: offset_label.to_string(),
            due_at,
            attempts: 0,
        }
    }

    /// The idempotent job key for a (booking, offset) pair
    pub fn id_for(booking_id: &ID, offset_label: &str) -> String {
        format!("{}/{}", booking_id, offset_label)
    }
}

impl Entity<String> for ReminderJob {
    fn id(&self) -> String {
        self.job_id.clone()
    }
}

/// Declarative retry behaviour for failed reminder deliveries,
/// independent of the queue backend.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total processing attempts before a job is abandoned
    pub max_attempts: i64,
    pub base_delay_millis: i64,
}

impl RetryPolicy {
    /// Exponential backoff: base delay doubled for every failed attempt
    pub fn backoff_delay_millis(&self, failed_attempts: i64) -> i64 {
        let exp = failed_attempts.max(0).min(16) as u32;
        self.base_delay_millis * 2_i64.pow(exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_millis: 1000 * 60,
        }
    }
}
