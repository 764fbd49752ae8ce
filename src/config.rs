use crate::error::AppError;

use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const SEARCH_ENGINE_URL: &str = "https://www.google.com/search";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Credentials needed to place outbound calls. All four values are required together.
#[derive(Clone, Debug)]
pub struct TelephonyConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Public base url Twilio uses to reach our status callback.
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub openai_api_key: String,
    pub openai_chat_model: String,
    pub telephony: Option<TelephonyConfig>,
    pub nominatim_url: String,
    pub overpass_url: String,
    pub search_engine_url: String,
    pub openai_api_url: String,
    pub twilio_api_url: String,
    pub assistant_poll_interval: Duration,
    pub assistant_run_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let openai_api_key =
            var("OPENAI_API_KEY").ok_or(AppError::Configuration("OPENAI_API_KEY not set"))?;

        let telephony = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
            var("BASE_URL"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number), Some(base_url)) => {
                Some(TelephonyConfig {
                    account_sid,
                    auth_token,
                    from_number,
                    base_url: base_url.trim_end_matches('/').to_string(),
                })
            }
            (None, None, None, None) => None,
            _ => {
                warn!("partial Twilio configuration; outbound calls are disabled");
                None
            }
        };

        let number = |key: &str, default: u64| -> Result<u64, AppError> {
            match var(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| AppError::Configuration("expected an integer duration")),
                None => Ok(default),
            }
        };
        let assistant_poll_interval =
            Duration::from_millis(number("ASSISTANT_POLL_INTERVAL_MS", 1_000)?);
        let assistant_run_timeout = Duration::from_secs(number("ASSISTANT_RUN_TIMEOUT_SECS", 30)?);

        Ok(Self {
            bind_addr: or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
            openai_api_key,
            openai_chat_model: or_default("OPENAI_CHAT_MODEL", "gpt-3.5-turbo"),
            telephony,
            nominatim_url: or_default("NOMINATIM_URL", NOMINATIM_URL),
            overpass_url: or_default("OVERPASS_URL", OVERPASS_URL),
            search_engine_url: or_default("SEARCH_ENGINE_URL", SEARCH_ENGINE_URL),
            openai_api_url: or_default("OPENAI_API_URL", OPENAI_API_URL),
            twilio_api_url: or_default("TWILIO_API_URL", TWILIO_API_URL),
            assistant_poll_interval,
            assistant_run_timeout,
        })
    }
}
