//! Receipt
//!
//! [`PriceBreakdown`] is the single derived view of what a checkout costs. The
//! same value feeds the order summary shown to the customer and the amount the
//! payment intent is created for.

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    basket::Basket,
    config::PricingConfig,
    discounts::{DiscountEligibility, DiscountError, DiscountTier, apply_tier, select_tier},
    pricing::{TotalPriceError, hourly_price},
    prices::Price,
};

/// Errors that can occur when building a price breakdown.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error calculating total price from basket items.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// Error applying a discount tier.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// The VAT component could not be represented in minor units.
    #[error("VAT calculation overflowed")]
    Vat,

    /// IO error
    #[error("IO error")]
    IO,
}

/// The hourly part of an hourly booking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyCharge {
    /// Rate charged per hour
    pub rate: Price,

    /// Hours booked
    pub hours: u32,

    /// Rate multiplied by hours
    pub amount: Price,
}

/// Every amount the customer sees, derived from the basket and the discount inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    /// Sum of the basket lines (or the hourly amount for hourly bookings)
    pub subtotal: Price,

    /// Flat booking fee
    pub booking_fee: Price,

    /// Subtotal plus booking fee
    pub service_total: Price,

    /// Applied discount tier
    pub tier: DiscountTier,

    /// Amount taken off the service total
    pub discount: Price,

    /// Membership fee added for new signups
    pub membership_fee: Price,

    /// Amount to charge
    pub order_total: Price,

    /// VAT included in the order total (informational)
    pub vat: Price,

    /// Hourly detail, present only for hourly bookings
    pub hourly: Option<HourlyCharge>,
}

impl PriceBreakdown {
    /// Price a basket.
    ///
    /// `hours` only matters for hourly bookings and is clamped to at least one.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if any money arithmetic overflows or mixes currencies.
    pub fn compute(
        basket: &Basket,
        hours: u32,
        eligibility: &DiscountEligibility,
        config: &PricingConfig,
    ) -> Result<Self, ReceiptError> {
        let hourly = match basket.hourly_service() {
            Some(service) => {
                let hours = hours.max(1);

                Some(HourlyCharge {
                    rate: service.price,
                    hours,
                    amount: hourly_price(&service.price, hours)?,
                })
            }
            None => None,
        };

        let subtotal = match &hourly {
            Some(charge) => charge.amount,
            None => basket.subtotal()?,
        };

        let service_total = subtotal.add(config.booking_fee)?;
        let tier = select_tier(eligibility);
        let applied = apply_tier(tier, &service_total, config)?;
        let order_total = applied.order_total(service_total)?;
        let vat = vat_component(&order_total, &config.vat_rate)?;

        Ok(Self {
            subtotal,
            booking_fee: config.booking_fee,
            service_total,
            tier,
            discount: applied.discount,
            membership_fee: applied.membership_fee,
            order_total,
            vat,
            hourly,
        })
    }

    /// The order total in minor units, as sent to the payment processor.
    #[must_use]
    pub fn amount_minor(&self) -> i64 {
        self.order_total.to_minor_units()
    }

    /// Whether this breakdown is for an hourly booking.
    #[must_use]
    pub fn is_hourly(&self) -> bool {
        self.hourly.is_some()
    }

    /// Prints the breakdown as a table followed by the VAT line.
    ///
    /// # Errors
    ///
    /// Returns an error if the breakdown cannot be written.
    pub fn write_to(&self, mut out: impl io::Write, basket: &Basket) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["Service", "Qty", "Price"]);

        if let Some(charge) = &self.hourly {
            let title = basket
                .hourly_service()
                .map_or_else(String::new, |service| service.title.clone());

            builder.push_record([
                title,
                format!("{}h @ {}", charge.hours, charge.rate),
                charge.amount.to_string(),
            ]);
        } else {
            for item in basket.iter() {
                builder.push_record([
                    item.service().title.clone(),
                    item.quantity().to_string(),
                    item.line_total()?.to_string(),
                ]);
            }
        }

        let item_rows = builder.count_records();

        builder.push_record([
            "Booking fee".to_string(),
            String::new(),
            self.booking_fee.to_string(),
        ]);

        if self.tier != DiscountTier::None {
            builder.push_record([self.tier.to_string(), String::new(), format!("-{}", self.discount)]);
        }

        if self.membership_fee.to_minor_units() != 0 {
            builder.push_record([
                "Membership (monthly)".to_string(),
                String::new(),
                self.membership_fee.to_string(),
            ]);
        }

        builder.push_record(["Total".to_string(), String::new(), self.order_total.to_string()]);

        let total_row = builder.count_records() - 1;

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());
        let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(1, separator);
        theme.insert_horizontal_line(item_rows, separator);
        theme.insert_horizontal_line(total_row, separator);

        table.with(theme);
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Rows::new(total_row..=total_row), Color::BOLD);
        table.modify(Columns::new(1..3), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)?;
        writeln!(out, " Includes VAT of {}\n", self.vat).map_err(|_err| ReceiptError::IO)
    }
}

/// VAT contained in a VAT-inclusive total: `total - total / (1 + rate)`, rounded to minor units.
///
/// # Errors
///
/// Returns [`ReceiptError::Vat`] if the division cannot be represented.
pub fn vat_component(total: &Price, rate: &Percentage) -> Result<Price, ReceiptError> {
    let gross = Decimal::from_i64(total.to_minor_units()).ok_or(ReceiptError::Vat)?;
    let divisor = Decimal::ONE + (*rate * Decimal::ONE);

    let net = gross
        .checked_div(divisor)
        .ok_or(ReceiptError::Vat)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(ReceiptError::Vat)?;

    let vat_minor = total
        .to_minor_units()
        .checked_sub(net)
        .ok_or(ReceiptError::Vat)?;

    Ok(Money::from_minor(vat_minor, total.currency()))
}
