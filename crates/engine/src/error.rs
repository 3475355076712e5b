//! Errors the engine can return.
//!
//! The engine is pure, so the only failures are malformed inputs coming from
//! configuration or user arguments:
//!
//! - [`InvalidGranularity`] for an unknown window unit.
//! - [`UnsupportedCurrency`] for a currency code the formatter does not know.
//! - [`InvalidMonth`] for a malformed `yyyy-MM` key.
//!
//!  [`InvalidGranularity`]: EngineError::InvalidGranularity
//!  [`UnsupportedCurrency`]: EngineError::UnsupportedCurrency
//!  [`InvalidMonth`]: EngineError::InvalidMonth
use api_types::MonthKeyError;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid granularity: {0}")]
    InvalidGranularity(String),
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error(transparent)]
    InvalidMonth(#[from] MonthKeyError),
}
