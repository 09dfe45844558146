use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Number;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::SystemTime;

use crate::error::ConversionError;

/// Body of `GET /v6/latest/{BASE}`. Keys are lower-cased before this is deserialized.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ApiResponse {
    pub result: Option<String>,
    pub base_code: Option<String>,
    pub time_last_update_utc: Option<String>,
    #[serde(default, deserialize_with = "exact_rates")]
    pub rates: Option<HashMap<String, Decimal>>,
}

/// Reads rates from the number's source text so they never pass through `f64`.
fn exact_rates<'de, D>(deserializer: D) -> Result<Option<HashMap<String, Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<HashMap<String, Number>>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let mut rates = HashMap::with_capacity(raw.len());
    for (code, number) in raw {
        let text = number.to_string();
        match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
            Ok(rate) => {
                rates.insert(code, rate);
            }
            Err(err) => {
                return Err(D::Error::custom(format!("rate {} = {}: {}", code, text, err)));
            }
        }
    }
    Ok(Some(rates))
}

/// One fetched rate table for a base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base_currency: String,
    pub fetched_at: SystemTime,
    pub rates: Option<HashMap<String, Decimal>>,
    pub status: String,
    pub last_update_label: Option<String>,
}

impl RateSnapshot {
    pub fn from_response(requested_base: &str, response: ApiResponse, fetched_at: SystemTime) -> Self {
        let rates = response.rates.map(|rates| {
            rates
                .into_iter()
                .map(|(code, rate)| (code.to_uppercase(), rate))
                .collect()
        });

        Self {
            base_currency: response
                .base_code
                .map(|code| code.to_uppercase())
                .unwrap_or_else(|| requested_base.to_uppercase()),
            fetched_at,
            rates,
            status: response.result.unwrap_or_default(),
            last_update_label: response.time_last_update_utc,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    pub fn rate_for(&self, code: &str) -> Option<Decimal> {
        self.rates.as_ref()?.get(code).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub converted_amount: Decimal,
    pub rate_used: Decimal,
    pub last_update_label: String,
}

/// What a caller gets back from a conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success(Conversion),
    Failure { message: String },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }
}

impl From<Result<Conversion, ConversionError>> for ConversionOutcome {
    fn from(result: Result<Conversion, ConversionError>) -> Self {
        match result {
            Ok(conversion) => ConversionOutcome::Success(conversion),
            Err(err) => ConversionOutcome::Failure {
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub unit_price: Decimal,
    pub currency: String,
}

impl Product {
    pub fn new(name: &str, unit_price: Decimal, currency: &str) -> Self {
        Self {
            name: name.to_string(),
            unit_price,
            currency: currency.to_string(),
        }
    }

    pub fn total(&self, quantity: u32) -> Decimal {
        self.unit_price * Decimal::from(quantity)
    }
}
