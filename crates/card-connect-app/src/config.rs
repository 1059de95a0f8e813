//! Runtime configuration sourced from the process environment.

use std::env;
use std::time::Duration;

use card_connect_core::{MAX_IMAGE_BYTES, join_endpoint};
use thiserror::Error;

/// Base URL of the card service.
pub const API_BASE_VAR: &str = "CARD_CONNECT_API_BASE";
/// Per-request timeout in whole seconds.
pub const TIMEOUT_SECS_VAR: &str = "CARD_CONNECT_TIMEOUT_SECS";
/// Maximum accepted image size in bytes.
pub const MAX_IMAGE_BYTES_VAR: &str = "CARD_CONNECT_MAX_IMAGE_BYTES";
/// Kill switch for outbound sends.
pub const DELIVERY_ENABLED_VAR: &str = "CARD_CONNECT_DELIVERY_ENABLED";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL joined with `upload-card` and `send-email`.
    pub api_base: String,
    /// Client-side timeout for each request.
    pub request_timeout: Duration,
    /// Upper bound on selected image size.
    pub max_image_bytes: usize,
    /// Whether sends may reach the delivery service.
    pub delivery_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_image_bytes: MAX_IMAGE_BYTES,
            delivery_enabled: true,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through `lookup`; unset keys take defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidNumber`] for unparsable or zero numeric
    /// values and [`ConfigError::InvalidBaseUrl`] when the base URL is not
    /// http(s).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base = lookup(API_BASE_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.api_base);
        join_endpoint(&api_base, "")
            .map_err(|error| ConfigError::InvalidBaseUrl(error.to_string()))?;

        let request_timeout = match lookup(TIMEOUT_SECS_VAR) {
            Some(raw) => Duration::from_secs(parse_positive(TIMEOUT_SECS_VAR, &raw)?),
            None => defaults.request_timeout,
        };

        let max_image_bytes = match lookup(MAX_IMAGE_BYTES_VAR) {
            Some(raw) => usize::try_from(parse_positive(MAX_IMAGE_BYTES_VAR, &raw)?)
                .unwrap_or(usize::MAX),
            None => defaults.max_image_bytes,
        };

        let delivery_enabled = lookup(DELIVERY_ENABLED_VAR)
            .map(|value| switch_enabled(&value))
            .unwrap_or(true);

        Ok(Self {
            api_base,
            request_timeout,
            max_image_bytes,
            delivery_enabled,
        })
    }
}

/// Kill-switch semantics: `0`, `false`, `off` (case-insensitive) disable
/// sends; any other value enables them.
fn switch_enabled(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    !(normalized == "0" || normalized == "false" || normalized == "off")
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Configuration error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric variable was not a positive integer.
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber {
        /// Variable name.
        key: &'static str,
        /// Raw value as read.
        value: String,
    },
    /// The service base URL is unusable.
    #[error("CARD_CONNECT_API_BASE is invalid: {0}")]
    InvalidBaseUrl(String),
}
