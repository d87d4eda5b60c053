//! Cart Fixtures

use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    items::CartItem,
    prices::parse_price,
    services::{PriceType, ServiceRef},
};

/// Wrapper for services in YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartFixture {
    /// Lines in the cart, in display order
    pub services: Vec<ServiceFixture>,
}

/// Service line from YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceFixture {
    /// Display title
    pub title: String,

    /// Price string, e.g. "40.00 GBP"
    pub price: String,

    /// Quantity ordered
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Pricing model
    pub price_type: Option<PriceType>,

    /// Price unit label
    pub price_unit: Option<String>,

    /// Hours chosen upstream
    pub hours: Option<u32>,

    /// Service category
    pub category: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl TryFrom<ServiceFixture> for CartItem {
    type Error = FixtureError;

    fn try_from(fixture: ServiceFixture) -> Result<Self, Self::Error> {
        let mut service = ServiceRef::new(fixture.title, parse_price(&fixture.price)?);

        service.price_type = fixture.price_type;
        service.price_unit = fixture.price_unit;
        service.hours = fixture.hours;
        service.category = fixture.category;

        Ok(CartItem::new(service, fixture.quantity)?)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn service_fixture_builds_cart_item() -> TestResult {
        let fixture: ServiceFixture = serde_norway::from_str(
            "title: Handyman\nprice: 60.00 GBP\nprice_type: hourly\nhours: 3\n",
        )?;

        let item = CartItem::try_from(fixture)?;

        assert_eq!(item.quantity(), 1);
        assert_eq!(item.price(), &Money::from_minor(6000, GBP));
        assert!(item.service().is_hourly());
        assert_eq!(item.service().hours, Some(3));

        Ok(())
    }

    #[test]
    fn zero_quantity_is_rejected() -> TestResult {
        let fixture: ServiceFixture =
            serde_norway::from_str("title: Oven clean\nprice: 40.00 GBP\nquantity: 0\n")?;

        assert!(matches!(
            CartItem::try_from(fixture),
            Err(FixtureError::Item(_))
        ));

        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<ServiceFixture, _> =
            serde_norway::from_str("title: Oven clean\nprice: 40.00 GBP\ncolour: red\n");

        assert!(result.is_err());
    }
}
