//! Configuration
//!
//! [`PricingConfig`] holds the commercial constants of the checkout (fees, discount
//! rates, VAT, lead times). It has sensible defaults and can be overridden from a
//! YAML file, with prices written as `"5.00 GBP"` and percentages as `"10%"`.
//!
//! [`EndpointConfig`] holds the collaborator endpoints and is read from the command
//! line or the environment.

use std::{fs, path::Path, time::Duration};

use clap::Parser;
use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    logging::LogFormat,
    prices::{PriceParseError, Price, currency_from_code, parse_price},
};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A price could not be parsed
    #[error(transparent)]
    Price(#[from] PriceParseError),

    /// A percentage could not be parsed
    #[error("invalid percentage: {0}")]
    InvalidPercentage(String),

    /// A price is in a different currency from the configured one
    #[error("{field} is priced in {found}, expected {expected}")]
    CurrencyMismatch {
        /// Name of the offending field
        field: &'static str,
        /// Currency of the field
        found: &'static str,
        /// Configured currency
        expected: &'static str,
    },

    /// Lead times or date bounds are inconsistent
    #[error("invalid booking bounds: {0}")]
    InvalidBounds(String),
}

/// Commercial constants used by the pricing engine and booking constraints.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Currency every price is charged in
    pub currency: &'static Currency,

    /// Flat fee added to every order
    pub booking_fee: Price,

    /// Monthly membership fee added when signing up at checkout
    pub membership_fee: Price,

    /// Discount for existing members
    pub member_discount: Percentage,

    /// Discount for customers signing up at checkout
    pub signup_discount: Percentage,

    /// VAT rate included in every price
    pub vat_rate: Percentage,

    /// Largest order total that may be charged
    pub max_amount: Price,

    /// Delay before re-checking a pending payment
    pub poll_delay: Duration,

    /// Days between today and the first bookable date
    pub standard_lead_days: i64,

    /// Lead days for members and customers signing up at checkout
    pub member_lead_days: i64,

    /// Fewest dates a booking must offer
    pub min_dates: usize,

    /// Most dates a booking may offer
    pub max_dates: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: iso::GBP,
            booking_fee: Money::from_minor(500, iso::GBP),
            membership_fee: Money::from_minor(999, iso::GBP),
            member_discount: Percentage::from(Decimal::new(10, 2)),
            signup_discount: Percentage::from(Decimal::new(27, 2)),
            vat_rate: Percentage::from(Decimal::new(20, 2)),
            max_amount: Money::from_minor(10_000_000, iso::GBP),
            poll_delay: Duration::from_secs(3),
            standard_lead_days: 2,
            member_lead_days: 1,
            min_dates: 2,
            max_dates: 5,
        }
    }
}

/// Raw YAML shape; every field falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PricingConfigFile {
    currency: Option<String>,
    booking_fee: Option<String>,
    membership_fee: Option<String>,
    member_discount: Option<String>,
    signup_discount: Option<String>,
    vat_rate: Option<String>,
    max_amount: Option<String>,
    poll_delay_ms: Option<u64>,
    standard_lead_days: Option<i64>,
    member_lead_days: Option<i64>,
    min_dates: Option<usize>,
    max_dates: Option<usize>,
}

impl PricingConfig {
    /// Load pricing configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or holds invalid values.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Parse pricing configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the YAML is malformed or holds invalid values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: PricingConfigFile = serde_norway::from_str(yaml)?;
        let defaults = Self::default();

        let currency = match file.currency.as_deref() {
            Some(code) => currency_from_code(code)?,
            None => defaults.currency,
        };

        let price = |field: &'static str, raw: Option<String>, fallback: Price| {
            let Some(raw) = raw else {
                return Ok(Money::from_minor(fallback.to_minor_units(), currency));
            };

            let parsed = parse_price(&raw)?;

            if parsed.currency() == currency {
                Ok(parsed)
            } else {
                Err(ConfigError::CurrencyMismatch {
                    field,
                    found: parsed.currency().iso_alpha_code,
                    expected: currency.iso_alpha_code,
                })
            }
        };

        let config = Self {
            currency,
            booking_fee: price("booking_fee", file.booking_fee, defaults.booking_fee)?,
            membership_fee: price("membership_fee", file.membership_fee, defaults.membership_fee)?,
            max_amount: price("max_amount", file.max_amount, defaults.max_amount)?,
            member_discount: optional_percentage(file.member_discount, defaults.member_discount)?,
            signup_discount: optional_percentage(file.signup_discount, defaults.signup_discount)?,
            vat_rate: optional_percentage(file.vat_rate, defaults.vat_rate)?,
            poll_delay: file
                .poll_delay_ms
                .map_or(defaults.poll_delay, Duration::from_millis),
            standard_lead_days: file
                .standard_lead_days
                .unwrap_or(defaults.standard_lead_days),
            member_lead_days: file.member_lead_days.unwrap_or(defaults.member_lead_days),
            min_dates: file.min_dates.unwrap_or(defaults.min_dates),
            max_dates: file.max_dates.unwrap_or(defaults.max_dates),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_dates == 0 || self.min_dates > self.max_dates {
            return Err(ConfigError::InvalidBounds(format!(
                "min_dates {} must be between 1 and max_dates {}",
                self.min_dates, self.max_dates
            )));
        }

        if self.member_lead_days < 0 || self.member_lead_days > self.standard_lead_days {
            return Err(ConfigError::InvalidBounds(format!(
                "member_lead_days {} must be between 0 and standard_lead_days {}",
                self.member_lead_days, self.standard_lead_days
            )));
        }

        Ok(())
    }
}

fn optional_percentage(raw: Option<String>, fallback: Percentage) -> Result<Percentage, ConfigError> {
    raw.as_deref().map_or(Ok(fallback), parse_percentage)
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "15%" for 15%
/// - Decimal format: "0.15" for 15%
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPercentage`] if the value is malformed or outside 0–100%.
pub fn parse_percentage(s: &str) -> Result<Percentage, ConfigError> {
    let trimmed = s.trim();

    let value = if let Some(points) = trimmed.strip_suffix('%') {
        points
            .trim()
            .parse::<Decimal>()
            .map(|points| points / Decimal::ONE_HUNDRED)
    } else {
        trimmed.parse::<Decimal>()
    }
    .map_err(|_err| ConfigError::InvalidPercentage(s.to_string()))?;

    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::InvalidPercentage(s.to_string()));
    }

    Ok(Percentage::from(value))
}

/// Collaborator endpoints and runtime settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "express-checkout", about = "Express checkout engine", long_about = None)]
pub struct EndpointConfig {
    /// Base URL of the edge functions (`check-subscription`, `create-payment-intent`, `track-checkout`)
    #[arg(long, env = "FUNCTIONS_URL")]
    pub functions_url: String,

    /// Anonymous key sent to the edge functions
    #[arg(long, env = "FUNCTIONS_ANON_KEY", hide_env_values = true)]
    pub functions_anon_key: String,

    /// Payment processor API base URL
    #[arg(long, env = "STRIPE_API_URL", default_value = "https://api.stripe.com/v1")]
    pub stripe_api_url: String,

    /// Publishable key used for client-secret confirmation and retrieval
    #[arg(long, env = "STRIPE_PUBLISHABLE_KEY", hide_env_values = true)]
    pub stripe_publishable_key: String,

    /// URL the processor returns to after a redirect-based payment method
    #[arg(long, env = "CHECKOUT_RETURN_URL")]
    pub return_url: Option<String>,

    /// Postcode lookup API base URL
    #[arg(long, env = "POSTCODES_API_URL", default_value = "https://api.postcodes.io")]
    pub postcodes_url: String,

    /// Timeout applied to every outbound HTTP request, in milliseconds
    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value_t = 10_000u64)]
    pub http_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl EndpointConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// The HTTP timeout as a [`Duration`].
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
