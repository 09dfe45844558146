use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::RateSource;
use crate::cache::RateCache;
use crate::config::TARGET_CURRENCY;
use crate::error::ConversionError;
use crate::models::{Conversion, ConversionOutcome, RateSnapshot};

/// Converts amounts into tenge at the current market rate.
pub struct ConversionService {
    source: Arc<dyn RateSource>,
    cache: RateCache,
}

impl ConversionService {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self::with_cache(source, RateCache::new())
    }

    pub fn with_cache(source: Arc<dyn RateSource>, cache: RateCache) -> Self {
        Self { source, cache }
    }

    pub async fn convert_to_kzt(&self, amount: Decimal, from_currency: &str) -> ConversionOutcome {
        self.convert(amount, from_currency).await.into()
    }

    /// Same as [`convert_to_kzt`](Self::convert_to_kzt) but keeps the typed error.
    pub async fn convert(&self, amount: Decimal, from_currency: &str) -> Result<Conversion, ConversionError> {
        if amount <= Decimal::ZERO {
            return Err(ConversionError::InvalidAmount);
        }

        let from = from_currency.trim().to_uppercase();
        if from == TARGET_CURRENCY {
            return Ok(Conversion {
                converted_amount: amount,
                rate_used: Decimal::ONE,
                last_update_label: "local".to_string(),
            });
        }

        if !is_currency_code(&from) {
            return Err(ConversionError::InvalidCurrency(from_currency.to_string()));
        }

        let source = Arc::clone(&self.source);
        let snapshot = self
            .cache
            .get_or_fetch(&from, |base| async move { source.fetch_latest(&base).await })
            .await
            .map_err(|err| {
                warn!(base = %from, error = %err, "could not obtain rates");
                ConversionError::from(err)
            })?;

        let rate = kzt_rate(&snapshot)?;
        let converted_amount = amount.checked_mul(rate).ok_or(ConversionError::Overflow)?;
        debug!(base = %from, %rate, "converted to KZT");

        Ok(Conversion {
            converted_amount,
            rate_used: rate,
            last_update_label: snapshot
                .last_update_label
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

fn kzt_rate(snapshot: &RateSnapshot) -> Result<Decimal, ConversionError> {
    if !snapshot.is_success() {
        return Err(ConversionError::Unsuccessful);
    }
    snapshot.rate_for(TARGET_CURRENCY).ok_or(ConversionError::MissingRate)
}

pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}
