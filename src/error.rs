use thiserror::Error;

/// Failures at the rate fetch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("empty or unreadable response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RateError::Timeout
        } else if let Some(status) = err.status() {
            RateError::HttpStatus(status.as_u16())
        } else {
            RateError::Network(err.to_string())
        }
    }
}

/// Every reason a conversion to KZT can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("amount must be > 0")]
    InvalidAmount,

    #[error("currency code must be 3 letters, got {0:?}")]
    InvalidCurrency(String),

    #[error("could not fetch the rate online: {0}")]
    Fetch(#[from] RateError),

    #[error("API returned unsuccessful result")]
    Unsuccessful,

    #[error("response has no KZT rate")]
    MissingRate,

    #[error("amount too large to convert")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("RATES_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
}
