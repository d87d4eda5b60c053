//! Pricing

use rusty_money::{Money, MoneyError};
use thiserror::Error;

use crate::{items::CartItem, prices::Price};

/// Errors that can occur while calculating total price.
#[derive(Debug, Error, PartialEq)]
pub enum TotalPriceError {
    /// No items were provided, so currency could not be determined.
    #[error("no items provided; cannot determine currency")]
    NoItems,

    /// A multiplication did not fit in minor units.
    #[error("price overflowed the representable range")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculates the total price of a list of cart items (unit price × quantity, summed).
///
/// # Errors
///
/// - [`TotalPriceError::NoItems`]: No items were provided, so currency could not be determined.
/// - [`TotalPriceError::Overflow`]: A line total did not fit in minor units.
/// - [`TotalPriceError::Money`]: Wrapped money arithmetic or currency mismatch error.
pub fn total_price(items: &[CartItem]) -> Result<Price, TotalPriceError> {
    let first = items.first().ok_or(TotalPriceError::NoItems)?;

    items.iter().try_fold(
        Money::from_minor(0, first.price().currency()),
        |acc, item| Ok(acc.add(item.line_total()?)?),
    )
}

/// Hourly rate multiplied by the number of hours booked.
///
/// # Errors
///
/// Returns [`TotalPriceError::Overflow`] if the product does not fit in minor units.
pub fn hourly_price(rate: &Price, hours: u32) -> Result<Price, TotalPriceError> {
    let minor = rate
        .to_minor_units()
        .checked_mul(i64::from(hours))
        .ok_or(TotalPriceError::Overflow)?;

    Ok(Money::from_minor(minor, rate.currency()))
}
