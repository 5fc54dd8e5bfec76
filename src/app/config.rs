//! Startup configuration for the model provider boundary.

use serde::Deserialize;
use url::Url;

use crate::domain::FlowError;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "MOONSIGNAL_API_KEY";

fn default_api_url() -> Url {
    Url::parse(
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent",
    )
    .expect("default API URL is valid")
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> u32 {
    8
}

/// Model provider API configuration.
#[derive(Debug, Clone)]
pub struct ModelApiConfig {
    /// Provider endpoint for structured generation.
    pub api_url: Url,
    /// Hard timeout per HTTP request, in seconds. Always enforced.
    pub timeout_secs: u64,
    /// Total attempts for retryable failures (429, 5xx, timeout).
    pub max_retries: u32,
    /// Base backoff delay; doubles per retry.
    pub retry_delay_ms: u64,
    /// Upper bound on concurrent in-flight provider requests. Calls beyond
    /// the bound block until a slot frees up.
    pub max_in_flight: u32,
}

impl Default for ModelApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelApiConfigDto {
    api_url: Option<Url>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    max_in_flight: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileDto {
    model: Option<ModelApiConfigDto>,
}

impl ModelApiConfig {
    /// Parse configuration from TOML, filling omitted keys with defaults.
    ///
    /// Expected shape:
    /// ```toml
    /// [model]
    /// timeout_secs = 30
    /// max_retries = 2
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, FlowError> {
        let file: ConfigFileDto = toml::from_str(contents)
            .map_err(|e| FlowError::Configuration(format!("Invalid config: {e}")))?;
        let dto = file.model.unwrap_or_default();
        let defaults = Self::default();
        Ok(Self {
            api_url: dto.api_url.unwrap_or(defaults.api_url),
            timeout_secs: dto.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_retries: dto.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: dto.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            max_in_flight: dto.max_in_flight.unwrap_or(defaults.max_in_flight),
        })
    }
}
