//! Items

use std::num::NonZeroU32;

use rusty_money::Money;
use thiserror::Error;

use crate::{pricing::TotalPriceError, prices::Price, services::ServiceRef};

/// Errors raised while building cart items.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    /// Cart items must have a quantity of at least one.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// A service in the cart together with how many of it were ordered.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem {
    service: ServiceRef,
    quantity: NonZeroU32,
}

impl CartItem {
    /// Creates a new cart item.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::ZeroQuantity`] when `quantity` is zero.
    pub fn new(service: ServiceRef, quantity: u32) -> Result<Self, ItemError> {
        let quantity = NonZeroU32::new(quantity).ok_or(ItemError::ZeroQuantity)?;

        Ok(Self { service, quantity })
    }

    /// Creates a cart item for a single unit of a service.
    pub fn single(service: ServiceRef) -> Self {
        Self {
            service,
            quantity: NonZeroU32::MIN,
        }
    }

    /// Returns the service of the item
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Returns the unit price of the item
    pub fn price(&self) -> &Price {
        &self.service.price
    }

    /// Returns the quantity ordered
    pub fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if the line total does not fit in minor units.
    pub fn line_total(&self) -> Result<Price, TotalPriceError> {
        let minor = self
            .price()
            .to_minor_units()
            .checked_mul(i64::from(self.quantity.get()))
            .ok_or(TotalPriceError::Overflow)?;

        Ok(Money::from_minor(minor, self.price().currency()))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use super::*;

    fn service() -> ServiceRef {
        ServiceRef::new("Oven clean", Money::from_minor(4000, GBP))
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert_eq!(CartItem::new(service(), 0), Err(ItemError::ZeroQuantity));
    }

    #[test]
    fn single_has_quantity_one() {
        assert_eq!(CartItem::single(service()).quantity(), 1);
    }

    #[test]
    fn line_total_multiplies_by_quantity() -> TestResult {
        let item = CartItem::new(service(), 3)?;

        assert_eq!(item.line_total()?, Money::from_minor(12_000, GBP));

        Ok(())
    }

    #[test]
    fn line_total_overflow_is_an_error() -> TestResult {
        let item = CartItem::new(ServiceRef::new("Huge", Money::from_minor(i64::MAX, GBP)), 2)?;

        assert_eq!(item.line_total(), Err(TotalPriceError::Overflow));

        Ok(())
    }
}
