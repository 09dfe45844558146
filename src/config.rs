use std::{env, time::Duration};

use crate::error::ConfigError;

pub const TARGET_CURRENCY: &str = "KZT";

/// How long a fetched rate table stays usable before it is requested again.
pub static CACHE_DURATION: Duration = Duration::new(600, 0); // 10 minutes

pub static REQUEST_TIMEOUT: Duration = Duration::new(12, 0);

pub const API_BASE_URL: &str = "https://open.er-api.com/v6/latest";

pub const USER_AGENT: &str = "KztPriceConsole/1.0";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime settings, read from `.env` and the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// `RUST_LOG`-style directives for the subscriber.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(
            env::var("RATES_API_URL").ok(),
            env::var("RATES_TIMEOUT_SECS").ok(),
            env::var("RUST_LOG").ok(),
        )
    }

    fn from_vars(
        api_url: Option<String>,
        timeout_secs: Option<String>,
        log_filter: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(filter) = log_filter.filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter.trim().to_string();
        }

        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = timeout_secs {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            if secs == 0 {
                return Err(ConfigError::InvalidTimeout(raw));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
