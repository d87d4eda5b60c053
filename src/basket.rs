//! Basket

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    items::CartItem,
    pricing::{TotalPriceError, total_price},
    prices::Price,
    services::ServiceRef,
};

/// Errors related to basket construction or totals.
#[derive(Debug, Error)]
pub enum BasketError {
    /// An item's currency differs from the basket currency (index, item currency, basket currency).
    #[error("Item {0} has currency {1}, but basket has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),
}

/// The services selected for one checkout.
#[derive(Debug, Clone)]
pub struct Basket {
    items: Vec<CartItem>,
    currency: &'static Currency,
}

impl Basket {
    /// Create a new, empty basket.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Basket {
            items: Vec::new(),
            currency,
        }
    }

    /// Create a new basket with the given items.
    ///
    /// # Errors
    ///
    /// Returns a `BasketError` if there was a currency mismatch error.
    pub fn with_items(
        items: impl Into<Vec<CartItem>>,
        currency: &'static Currency,
    ) -> Result<Self, BasketError> {
        let items = items.into();

        items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_currency(i, item, currency))?;

        Ok(Basket { items, currency })
    }

    /// Create a basket from a single-service entry point.
    pub fn from_service(service: ServiceRef) -> Self {
        let currency = service.price.currency();

        Basket {
            items: vec![CartItem::single(service)],
            currency,
        }
    }

    /// Calculate the subtotal of the basket.
    ///
    /// # Errors
    ///
    /// Returns a `TotalPriceError` if there was a money arithmetic or overflow error.
    pub fn subtotal(&self) -> Result<Price, TotalPriceError> {
        if self.is_empty() {
            return Ok(Money::from_minor(0, self.currency));
        }

        total_price(&self.items)
    }

    /// The service to charge by the hour, if this booking is hourly.
    ///
    /// Only a basket holding exactly one line whose service is hourly counts; a
    /// mixed basket is never hourly even when one of its services is.
    pub fn hourly_service(&self) -> Option<&ServiceRef> {
        match self.items.as_slice() {
            [only] if only.service().is_hourly() => Some(only.service()),
            _ => None,
        }
    }

    /// Whether this booking is charged by the hour.
    pub fn is_hourly(&self) -> bool {
        self.hourly_service().is_some()
    }

    /// A short label describing the basket contents.
    pub fn label(&self) -> String {
        match self.items.as_slice() {
            [] => String::new(),
            [only] => only.service().title.clone(),
            [first, rest @ ..] => format!("{} + {} more", first.service().title, rest.len()),
        }
    }

    /// Iterate over the items in the basket.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Get the number of lines in the basket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the basket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the basket.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

fn check_currency(
    index: usize,
    item: &CartItem,
    currency: &'static Currency,
) -> Result<(), BasketError> {
    let item_currency = item.price().currency();

    if item_currency == currency {
        Ok(())
    } else {
        Err(BasketError::CurrencyMismatch(
            index,
            item_currency.iso_alpha_code,
            currency.iso_alpha_code,
        ))
    }
}
