//! Prices

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use thiserror::Error;

/// Money in one of the static ISO currencies.
pub type Price = Money<'static, Currency>;

/// Errors raised while parsing a price string such as `"40.00 GBP"`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceParseError {
    /// The string was not in `AMOUNT CURRENCY` form.
    #[error("expected format 'AMOUNT CURRENCY', got: {0}")]
    Format(String),

    /// The amount could not be parsed or does not fit in minor units.
    #[error("invalid amount: {0}")]
    Amount(String),

    /// The currency code is not supported.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Parse a price in `AMOUNT CURRENCY` form, e.g. `"9.99 GBP"`.
///
/// # Errors
///
/// Returns a [`PriceParseError`] if the format, amount or currency is invalid.
pub fn parse_price(s: &str) -> Result<Price, PriceParseError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PriceParseError::Format(s.to_string()));
    };

    let currency = currency_from_code(code)?;

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| PriceParseError::Amount(s.to_string()))?;

    let minor = major_to_minor(amount, currency)
        .ok_or_else(|| PriceParseError::Amount(s.to_string()))?;

    Ok(Money::from_minor(minor, currency))
}

/// Look up a supported ISO currency by its alpha code.
///
/// # Errors
///
/// Returns [`PriceParseError::UnknownCurrency`] for anything other than GBP, USD or EUR.
pub fn currency_from_code(code: &str) -> Result<&'static Currency, PriceParseError> {
    match code.to_ascii_uppercase().as_str() {
        "GBP" => Ok(iso::GBP),
        "USD" => Ok(iso::USD),
        "EUR" => Ok(iso::EUR),
        _ => Err(PriceParseError::UnknownCurrency(code.to_string())),
    }
}

/// Convert a major-unit decimal into minor units, rounding half away from zero.
pub fn major_to_minor(amount: Decimal, currency: &Currency) -> Option<i64> {
    let scale = Decimal::from(10_i64.checked_pow(currency.exponent)?);

    amount
        .checked_mul(scale)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// The amount of a price in major units (e.g. pounds), exactly.
pub fn to_decimal(price: &Price) -> Decimal {
    Decimal::new(price.to_minor_units(), price.currency().exponent)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, GBP, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_amount_and_currency() -> TestResult {
        let price = parse_price("40.00 GBP")?;

        assert_eq!(price, Money::from_minor(4000, GBP));

        Ok(())
    }

    #[test]
    fn parse_price_rounds_sub_penny_amounts() -> TestResult {
        assert_eq!(parse_price("9.995 GBP")?.to_minor_units(), 1000);
        assert_eq!(parse_price("9.994 GBP")?.to_minor_units(), 999);

        Ok(())
    }

    #[test]
    fn parse_price_rejects_missing_currency() {
        let result = parse_price("2.99GBP");

        assert!(matches!(result, Err(PriceParseError::Format(_))));
    }

    #[test]
    fn parse_price_rejects_trailing_tokens() {
        let result = parse_price("2.99 GBP extra");

        assert!(matches!(result, Err(PriceParseError::Format(_))));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        let result = parse_price("2.99 ABC");

        assert!(matches!(result, Err(PriceParseError::UnknownCurrency(code)) if code == "ABC"));
    }

    #[test]
    fn parse_price_rejects_bad_amount() {
        let result = parse_price("two GBP");

        assert!(matches!(result, Err(PriceParseError::Amount(_))));
    }

    #[test]
    fn currency_codes_are_case_insensitive() -> TestResult {
        assert_eq!(currency_from_code("gbp")?, GBP);
        assert_eq!(currency_from_code("Usd")?, USD);
        assert_eq!(currency_from_code("EUR")?, EUR);

        Ok(())
    }

    #[test]
    fn to_decimal_uses_currency_exponent() {
        let price = Money::from_minor(4284, GBP);

        assert_eq!(to_decimal(&price), Decimal::new(4284, 2));
    }
}
