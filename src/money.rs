//! Money Conversion Module
//!
//! Balances and transfer amounts are fixed-point decimals with a scale of 2.
//! Client input arrives as strings (CLI, JSON) and must be parsed without
//! silently dropping precision; the validation pipeline decides what to do
//! with amounts that carry more than two fractional digits.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Number of fractional digits carried by every balance and amount.
pub const MONEY_SCALE: u32 = 2;

/// Money conversion errors
#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Empty amount string")]
    Empty,
}

/// Parse a client amount string into a `Decimal`, keeping its declared scale.
///
/// `"100.50"` keeps scale 2, `"1.505"` keeps scale 3. Sign and range checks
/// belong to the validation pipeline, not to the parser.
pub fn parse_money(input: &str) -> Result<Decimal, MoneyError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::Empty);
    }
    Decimal::from_str(trimmed).map_err(|_| MoneyError::InvalidFormat(trimmed.to_string()))
}

/// Number of fractional digits as declared by the value (trailing zeros count).
#[inline]
pub fn declared_scale(amount: &Decimal) -> u32 {
    amount.scale()
}

/// Format a balance or amount for display and log output (always 2 digits).
pub fn format_money(amount: Decimal) -> String {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded.to_string()
}
