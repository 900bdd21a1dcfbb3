use chrono_tz::Tz;
use tracing::{info, log::warn};
use varsel_domain::{ReminderOffset, ReminderSettings, RetryPolicy};

/// Credentials for the transactional email provider. Absent credentials
/// disable the email channel rather than failing at send time.
#[derive(Debug, Clone)]
pub struct EmailProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Offsets before the event time at which reminders fire, and the
    /// sweep lookahead window (clamped to the largest offset)
    pub reminder_settings: ReminderSettings,
    /// Retry behaviour for failed reminder deliveries
    pub retry_policy: RetryPolicy,
    /// How often the reconciliation sweep runs
    pub sweep_interval_secs: u64,
    /// How often the queue worker polls for due jobs
    pub queue_poll_interval_secs: u64,
    /// FCM server key. `None` disables the push channel.
    pub fcm_server_key: Option<String>,
    /// `None` disables the email channel
    pub email_provider: Option<EmailProviderConfig>,
    /// Timezone used when formatting event times in reminder text
    pub display_timezone: Tz,
    /// Base url that reminder click targets point into
    pub click_target_base_url: String,
}

fn parse_offsets(raw: &str) -> Option<Vec<ReminderOffset>> {
    let offsets = raw
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.parse::<ReminderOffset>())
        .collect::<Result<Vec<_>, _>>();
    match offsets {
        Ok(offsets) if !offsets.is_empty() => Some(offsets),
        _ => None,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, raw, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let offsets = match std::env::var("REMINDER_OFFSETS") {
            Ok(raw) => match parse_offsets(&raw) {
                Some(offsets) => offsets,
                None => {
                    warn!(
                        "The given REMINDER_OFFSETS: {} is not valid, falling back to the defaults.",
                        raw
                    );
                    ReminderSettings::default().offsets
                }
            },
            Err(_) => ReminderSettings::default().offsets,
        };
        let lookahead_hours = env_u64("REMINDER_LOOKAHEAD_HOURS", 48);
        let reminder_settings =
            ReminderSettings::new(offsets, lookahead_hours as i64 * 1000 * 60 * 60);

        let fcm_server_key = std::env::var("FCM_SERVER_KEY").ok();
        if fcm_server_key.is_none() {
            info!("Did not find FCM_SERVER_KEY environment variable. Push channel is disabled.");
        }

        let email_provider = match (
            std::env::var("EMAIL_API_URL"),
            std::env::var("EMAIL_API_KEY"),
            std::env::var("EMAIL_FROM"),
        ) {
            (Ok(api_url), Ok(api_key), Ok(from)) => Some(EmailProviderConfig {
                api_url,
                api_key,
                from,
            }),
            _ => {
                info!("Email provider credentials are not fully configured. Email channel is disabled.");
                None
            }
        };

        let display_timezone = match std::env::var("DISPLAY_TIMEZONE") {
            Ok(raw) => match raw.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(
                        "The given DISPLAY_TIMEZONE: {} is not valid, falling back to UTC.",
                        raw
                    );
                    chrono_tz::UTC
                }
            },
            Err(_) => chrono_tz::UTC,
        };

        Self {
            reminder_settings,
            retry_policy: RetryPolicy {
                max_attempts: env_u64("REMINDER_MAX_ATTEMPTS", 5) as i64,
                base_delay_millis: env_u64("REMINDER_RETRY_BASE_SECS", 60) as i64 * 1000,
            },
            sweep_interval_secs: env_u64("SWEEP_INTERVAL_SECS", 60 * 60),
            queue_poll_interval_secs: env_u64("QUEUE_POLL_INTERVAL_SECS", 10),
            fcm_server_key,
            email_provider,
            display_timezone,
            click_target_base_url: std::env::var("CLICK_TARGET_BASE_URL")
                .unwrap_or_else(|_| "https://localhost".into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_list() {
        let offsets = parse_offsets("24h,2h").unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].label, "24h");
        assert_eq!(offsets[1].label, "2h");

        assert!(parse_offsets("").is_none());
        assert!(parse_offsets("24h,nope").is_none());
    }
}
