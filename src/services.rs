//! Services

use serde::{Deserialize, Serialize};

use crate::prices::Price;

/// How a service is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// A fixed price per unit of quantity.
    Fixed,

    /// A rate charged per hour of work.
    Hourly,
}

/// A bookable service as selected on one of the configurator pages.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRef {
    /// Display title, e.g. "Handyman • Hourly (4h)"
    pub title: String,

    /// Unit price (or hourly rate for hourly services)
    pub price: Price,

    /// Explicit pricing model, when the catalogue provides one
    pub price_type: Option<PriceType>,

    /// Free-form price unit, e.g. "per hour"
    pub price_unit: Option<String>,

    /// Hours chosen on the configurator page
    pub hours: Option<u32>,

    /// Service category, e.g. "cleaning"
    pub category: Option<String>,
}

impl ServiceRef {
    /// Create a service with a title and unit price.
    pub fn new(title: impl Into<String>, price: Price) -> Self {
        Self {
            title: title.into(),
            price,
            price_type: None,
            price_unit: None,
            hours: None,
            category: None,
        }
    }

    /// Set the pricing model.
    #[must_use]
    pub fn with_price_type(mut self, price_type: PriceType) -> Self {
        self.price_type = Some(price_type);
        self
    }

    /// Set the price unit label.
    #[must_use]
    pub fn with_price_unit(mut self, unit: impl Into<String>) -> Self {
        self.price_unit = Some(unit.into());
        self
    }

    /// Set the hours chosen upstream.
    #[must_use]
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours = Some(hours);
        self
    }

    /// Set the service category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether this service, on its own, is charged by the hour.
    ///
    /// A service is hourly when its type says so, its unit mentions hours, or its
    /// title mentions "hourly".
    pub fn is_hourly(&self) -> bool {
        if self.price_type == Some(PriceType::Hourly) {
            return true;
        }

        let unit_is_hourly = self
            .price_unit
            .as_deref()
            .is_some_and(|unit| unit.to_lowercase().contains("hour"));

        unit_is_hourly || self.title.to_lowercase().contains("hourly")
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};

    use super::*;

    fn service(title: &str) -> ServiceRef {
        ServiceRef::new(title, Money::from_minor(6000, GBP))
    }

    #[test]
    fn explicit_type_is_hourly() {
        assert!(service("Handyman").with_price_type(PriceType::Hourly).is_hourly());
    }

    #[test]
    fn explicit_fixed_type_with_plain_title_is_not_hourly() {
        assert!(!service("Oven clean").with_price_type(PriceType::Fixed).is_hourly());
    }

    #[test]
    fn unit_containing_hour_is_hourly() {
        assert!(service("Handyman").with_price_unit("Per Hour").is_hourly());
    }

    #[test]
    fn title_containing_hourly_is_hourly() {
        assert!(service("Handyman • Hourly (4h)").is_hourly());
    }

    #[test]
    fn plain_service_is_not_hourly() {
        assert!(!service("Handyman • Half Day (4h)").is_hourly());
    }
}
