//! Discounts
//!
//! A checkout qualifies for at most one discount tier. Tiers are evaluated in
//! priority order: existing members first, then customers signing up for the
//! membership at checkout, otherwise no discount.

use std::fmt;

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError};
use thiserror::Error;

use crate::{config::PricingConfig, prices::Price, subscription::SubscriptionStatus};

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// The discount tier applied to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscountTier {
    /// No discount.
    #[default]
    None,

    /// The customer already holds an active membership.
    ExistingMember,

    /// The customer is signing up for the membership with this order.
    NewSignup,
}

impl fmt::Display for DiscountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiscountTier::None => "No discount",
            DiscountTier::ExistingMember => "Member discount",
            DiscountTier::NewSignup => "New member discount",
        })
    }
}

/// Everything the tier selection depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountEligibility {
    /// Resolved membership status for the entered email
    pub status: SubscriptionStatus,

    /// Whether the entered email passes validation
    pub email_valid: bool,

    /// Whether the membership add-on is opted in
    pub membership_addon: bool,
}

/// Pick the single tier this checkout qualifies for.
pub fn select_tier(eligibility: &DiscountEligibility) -> DiscountTier {
    if !eligibility.email_valid {
        return DiscountTier::None;
    }

    match eligibility.status {
        SubscriptionStatus::Active => DiscountTier::ExistingMember,
        SubscriptionStatus::Inactive if eligibility.membership_addon => DiscountTier::NewSignup,
        SubscriptionStatus::Inactive | SubscriptionStatus::Unknown => DiscountTier::None,
    }
}

/// The money effect of a tier on a service total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedDiscount {
    /// Tier that was applied
    pub tier: DiscountTier,

    /// Amount taken off the service total
    pub discount: Price,

    /// Membership fee added on top (non-zero only for new signups)
    pub membership_fee: Price,
}

impl AppliedDiscount {
    /// Service total less the discount plus any membership fee.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the currencies differ.
    pub fn order_total(&self, service_total: Price) -> Result<Price, MoneyError> {
        service_total.sub(self.discount)?.add(self.membership_fee)
    }
}

/// Apply a tier to the service total.
///
/// # Errors
///
/// Returns a [`DiscountError`] if the percentage cannot be represented in minor units.
pub fn apply_tier(
    tier: DiscountTier,
    service_total: &Price,
    config: &PricingConfig,
) -> Result<AppliedDiscount, DiscountError> {
    let zero = Money::from_minor(0, service_total.currency());

    let applied = match tier {
        DiscountTier::None => AppliedDiscount {
            tier,
            discount: zero,
            membership_fee: zero,
        },
        DiscountTier::ExistingMember => AppliedDiscount {
            tier,
            discount: discount_on(service_total, &config.member_discount)?,
            membership_fee: zero,
        },
        DiscountTier::NewSignup => AppliedDiscount {
            tier,
            discount: discount_on(service_total, &config.signup_discount)?,
            membership_fee: config.membership_fee,
        },
    };

    Ok(applied)
}

/// Calculate the discount amount on a price for a percentage.
///
/// The discounted price is rounded first and the discount is whatever remains, so
/// the customer always pays `round(price × (1 - percent))`.
pub(crate) fn discount_on(price: &Price, percent: &Percentage) -> Result<Price, DiscountError> {
    let minor = price.to_minor_units();
    let remaining = Percentage::from(Decimal::ONE - (*percent * Decimal::ONE));
    let discounted_minor = percent_of_minor(&remaining, minor)?;

    let Some(discount_minor) = minor.checked_sub(discounted_minor) else {
        return Err(DiscountError::PercentConversion);
    };

    Ok(Money::from_minor(discount_minor, price.currency()))
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
pub(crate) fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let percent = *percent * Decimal::ONE;

    let Some(minor) = Decimal::from_i64(minor) else {
        return Err(DiscountError::PercentConversion);
    };

    let Some(applied) = percent.checked_mul(minor) else {
        return Err(DiscountError::PercentConversion);
    };

    let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let Some(rounded) = rounded.to_i64() else {
        return Err(DiscountError::PercentConversion);
    };

    Ok(rounded)
}
