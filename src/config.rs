//! Process configuration read from the environment at startup

use crate::messaging::TwilioCredentials;
use crate::state_machine::AdvisorId;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub advisors: Vec<AdvisorId>,
    pub reminder_interval: Duration,
    /// `None` unless all three Twilio variables are set
    pub twilio: Option<TwilioCredentials>,
    pub advisor_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let db_path = non_empty("DROPZONE_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.dropzone-bot/conversations.db"))
            },
            PathBuf::from,
        );

        let port = match non_empty("DROPZONE_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "DROPZONE_PORT",
                    value,
                })?,
            None => DEFAULT_PORT,
        };

        let interval_secs = match non_empty("DROPZONE_REMINDER_INTERVAL_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    name: "DROPZONE_REMINDER_INTERVAL_SECS",
                    value,
                }
            })?,
            None => DEFAULT_REMINDER_INTERVAL_SECS,
        };
        if interval_secs == 0 {
            return Err(ConfigError::Zero {
                name: "DROPZONE_REMINDER_INTERVAL_SECS",
            });
        }

        let advisors = non_empty("DROPZONE_ADVISORS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let twilio = match (
            non_empty("TWILIO_ACCOUNT_SID"),
            non_empty("TWILIO_AUTH_TOKEN"),
            non_empty("TWILIO_WHATSAPP_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(whatsapp_number)) => {
                Some(TwilioCredentials {
                    account_sid,
                    auth_token,
                    whatsapp_number,
                })
            }
            _ => None,
        };

        Ok(Self {
            db_path,
            port,
            advisors,
            reminder_interval: Duration::from_secs(interval_secs),
            twilio,
            advisor_webhook_url: non_empty("DROPZONE_ADVISOR_WEBHOOK_URL"),
        })
    }
}
