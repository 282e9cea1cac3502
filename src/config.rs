//! Process configuration read from the environment

use crate::runtime::{DialogConfig, DEFAULT_QUEUE_CAPACITY};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the bot process
#[derive(Clone)]
pub struct BotConfig {
    /// Bot API token, never logged
    pub token: String,
    pub api_url: String,
    /// Long-poll wait passed to `getUpdates`
    pub poll_timeout: Duration,
    pub queue_capacity: usize,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = var("CARBOT_TELEGRAM_TOKEN").ok_or(ConfigError::Missing("CARBOT_TELEGRAM_TOKEN"))?;
        let api_url = var("CARBOT_API_URL")
            .map_or_else(|| DEFAULT_API_URL.to_string(), |url| url.trim_end_matches('/').to_string());

        let poll_timeout_secs = match var("CARBOT_POLL_TIMEOUT_SECS") {
            Some(value) => parse_number("CARBOT_POLL_TIMEOUT_SECS", &value)?,
            None => DEFAULT_POLL_TIMEOUT_SECS,
        };

        let queue_capacity = match var("CARBOT_QUEUE_CAPACITY") {
            Some(value) => {
                let capacity = parse_number("CARBOT_QUEUE_CAPACITY", &value)?;
                if capacity == 0 {
                    return Err(ConfigError::Invalid {
                        name: "CARBOT_QUEUE_CAPACITY",
                        value,
                        reason: "must be at least 1".to_string(),
                    });
                }
                usize::try_from(capacity).map_err(|e| ConfigError::Invalid {
                    name: "CARBOT_QUEUE_CAPACITY",
                    value,
                    reason: e.to_string(),
                })?
            }
            None => DEFAULT_QUEUE_CAPACITY,
        };

        Ok(Self {
            token,
            api_url,
            poll_timeout: Duration::from_secs(poll_timeout_secs),
            queue_capacity,
        })
    }

    pub fn dialog_config(&self) -> DialogConfig {
        DialogConfig {
            queue_capacity: self.queue_capacity,
        }
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
