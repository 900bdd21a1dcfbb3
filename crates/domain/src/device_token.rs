use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Android,
    Ios,
}

#[derive(Error, Debug)]
pub enum InvalidPlatformError {
    #[error("Platform: {0} is not one of web, android or ios")]
    Unknown(String),
}

impl FromStr for Platform {
    type Err = InvalidPlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            _ => Err(InvalidPlatformError::Unknown(s.to_string())),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
        };
        write!(f, "{}", s)
    }
}

/// A push endpoint registered by one of the recipients devices.
///
/// Tokens are deactivated rather than deleted when the push provider
/// reports them as invalid, or when the user unregisters the device.
/// Deactivation is monotonic, a token is never reactivated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceToken {
    /// Opaque identifier from the push provider, unique per
    /// (recipient, platform, device)
    pub token: String,
    pub recipient: ID,
    pub platform: Platform,
    pub active: bool,
    pub last_used_at: i64,
}

impl DeviceToken {
    pub fn new(token: &str, recipient: ID, platform: Platform, now: i64) -> Self {
        Self {
            token: token.to_string(),
            recipient,
            platform,
            active: true,
            last_used_at: now,
        }
    }
}

impl Entity<String> for DeviceToken {
    fn id(&self) -> String {
        self.token.clone()
    }
}
