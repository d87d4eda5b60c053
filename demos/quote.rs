//! Quote Example
//!
//! Prints the price breakdown for a cart fixture.
//!
//! Use `-f` to load a fixture set by name
//! Use `-H` to set the hours for an hourly service
//! Use `-s` to pick the customer's membership status (`unknown`, `member`, `guest`)
//! Use `-a` to opt into the membership add-on

use std::io;

use anyhow::Result;

use clap::Parser;
use express_checkout::{
    discounts::DiscountEligibility,
    fixtures::Fixture,
    receipt::PriceBreakdown,
    subscription::SubscriptionStatus,
    utils::QuoteArgs,
};

/// Quote Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = QuoteArgs::parse();

    let fixture = Fixture::from_set(&args.fixture)?;
    let basket = fixture.basket()?;

    let hours = args
        .hours
        .or_else(|| basket.hourly_service().and_then(|service| service.hours))
        .unwrap_or(1);

    let status = SubscriptionStatus::from(args.status);

    let eligibility = DiscountEligibility {
        status,
        email_valid: true,
        membership_addon: args.addon && status != SubscriptionStatus::Active,
    };

    let breakdown = PriceBreakdown::compute(&basket, hours, &eligibility, fixture.config())?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    breakdown.write_to(&mut handle, &basket)?;

    println!("\nCharge: {} minor units ({})", breakdown.amount_minor(), breakdown.tier);

    Ok(())
}
