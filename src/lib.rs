//! Converts prices into Kazakhstani tenge using live rates from open.er-api.com.

pub mod api;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod service;

pub use api::{HttpRateSource, RateSource};
pub use cache::RateCache;
pub use error::{ConversionError, RateError};
pub use models::{Conversion, ConversionOutcome, Product, RateSnapshot};
pub use service::ConversionService;
