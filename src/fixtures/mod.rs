//! Fixtures
//!
//! Carts live in `fixtures/carts/{name}.yml` and pricing overrides in
//! `fixtures/pricing/{name}.yml`. A set without a pricing file uses the defaults.

use std::{fs, path::PathBuf};

use jiff::civil::Date;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    basket::{Basket, BasketError},
    config::{ConfigError, PricingConfig},
    fixtures::carts::CartFixture,
    items::{CartItem, ItemError},
    prices::PriceParseError,
    session::{CheckoutError, CheckoutSession},
};

pub mod carts;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price
    #[error(transparent)]
    Price(#[from] PriceParseError),

    /// Invalid cart line
    #[error(transparent)]
    Item(#[from] ItemError),

    /// Invalid pricing configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No cart loaded
    #[error("No cart loaded; cannot create basket")]
    NoServices,

    /// Basket creation error
    #[error("Failed to create basket: {0}")]
    Basket(#[from] BasketError),

    /// Session creation error
    #[error("Failed to start checkout: {0}")]
    Checkout(#[from] CheckoutError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    base_path: PathBuf,
    items: Vec<CartItem>,
    config: PricingConfig,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            items: Vec::new(),
            config: PricingConfig::default(),
        }
    }

    /// Load a cart from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds an invalid line.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CartFixture = serde_norway::from_str(&contents)?;

        for service in fixture.services {
            self.items.push(service.try_into()?);
        }

        Ok(self)
    }

    /// Load pricing overrides from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid values.
    pub fn load_pricing(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.config = PricingConfig::from_yaml_file(self.pricing_path(name))?;

        Ok(self)
    }

    /// Load a fixture set: the cart with this name, plus pricing of the same name
    /// when such a file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_cart(name)?;

        if fixture.pricing_path(name).exists() {
            fixture.load_pricing(name)?;
        }

        Ok(fixture)
    }

    /// Get all cart lines
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Get the pricing configuration
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Get the currency of the loaded cart
    ///
    /// # Errors
    ///
    /// Returns an error if no cart has been loaded yet.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.items
            .first()
            .map(|item| item.price().currency())
            .ok_or(FixtureError::NoServices)
    }

    /// Create a basket from the loaded cart
    ///
    /// # Errors
    ///
    /// Returns an error if no cart is loaded or the lines mix currencies.
    pub fn basket(&self) -> Result<Basket, FixtureError> {
        let currency = self.currency()?;

        Ok(Basket::with_items(self.items.clone(), currency)?)
    }

    /// Start a checkout for the loaded cart
    ///
    /// # Errors
    ///
    /// Returns an error if the basket cannot be built or does not match the pricing currency.
    pub fn session(&self, today: Date) -> Result<CheckoutSession, FixtureError> {
        Ok(CheckoutSession::new(self.basket()?, self.config.clone(), today)?)
    }

    fn pricing_path(&self, name: &str) -> PathBuf {
        self.base_path.join("pricing").join(format!("{name}.yml"))
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
