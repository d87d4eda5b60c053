//! Integration tests for the pricing and booking rules of a checkout session.
//!
//! Scenarios run against the default pricing: a £5.00 booking fee, 10% member
//! discount, 27% signup discount plus a £9.99 membership fee and 20% VAT.

use jiff::civil::{Date, date};
use rusty_money::{Money, iso::GBP};
use testresult::TestResult;

use express_checkout::{
    basket::Basket,
    booking::{DateToggle, TimeSlot},
    config::PricingConfig,
    discounts::DiscountTier,
    fixtures::Fixture,
    items::CartItem,
    services::{PriceType, ServiceRef},
    session::CheckoutSession,
    subscription::SubscriptionStatus,
    validation::MissingRequirement,
};

const TODAY: Date = date(2026, 3, 2);

fn oven_clean() -> TestResult<CheckoutSession> {
    Ok(Fixture::from_set("oven-clean")?.session(TODAY)?)
}

fn resolve(session: &mut CheckoutSession, email: &str, active: bool) -> TestResult {
    let ticket = session.set_email(email).ok_or("email should be valid")?;

    session.apply_subscription(&ticket, Ok(active));

    Ok(())
}

#[test]
fn scenario_no_subscription_pays_service_total() -> TestResult {
    let session = oven_clean()?;
    let breakdown = session.breakdown()?;

    assert_eq!(breakdown.service_total, Money::from_minor(4500, GBP));
    assert_eq!(breakdown.order_total, Money::from_minor(4500, GBP));
    assert_eq!(breakdown.tier, DiscountTier::None);
    assert_eq!(breakdown.vat, Money::from_minor(750, GBP));

    Ok(())
}

#[test]
fn scenario_active_member_gets_ten_percent_off() -> TestResult {
    let mut session = oven_clean()?;

    resolve(&mut session, "member@example.com", true)?;

    let breakdown = session.breakdown()?;

    assert_eq!(breakdown.tier, DiscountTier::ExistingMember);
    assert_eq!(breakdown.discount, Money::from_minor(450, GBP));
    assert_eq!(breakdown.order_total, Money::from_minor(4050, GBP));
    assert_eq!(breakdown.membership_fee, Money::from_minor(0, GBP));

    Ok(())
}

#[test]
fn scenario_new_signup_pays_discounted_total_plus_fee() -> TestResult {
    let mut session = oven_clean()?;

    resolve(&mut session, "guest@example.com", false)?;
    session.set_membership_addon(true)?;

    let breakdown = session.breakdown()?;

    assert_eq!(breakdown.tier, DiscountTier::NewSignup);
    assert_eq!(breakdown.discount, Money::from_minor(1215, GBP));
    assert_eq!(breakdown.membership_fee, Money::from_minor(999, GBP));
    assert_eq!(breakdown.order_total, Money::from_minor(4284, GBP));
    assert_eq!(breakdown.vat, Money::from_minor(714, GBP));

    Ok(())
}

#[test]
fn scenario_second_date_opens_the_gate() -> TestResult {
    let mut session = oven_clean()?;

    session.set_full_name("Jane Smith");
    session.set_email("jane@example.com");
    session.set_phone("+44 (0)7700-900123");
    session.set_postcode("SW1A 1AA");
    session.set_address_line1("10 Downing Street");
    session.set_terms_accepted(true);
    session.toggle_time_slot(TimeSlot::MidAfternoon);
    session.toggle_date(date(2026, 3, 9));

    assert!(!session.is_valid());
    assert_eq!(
        session.missing_requirements().as_slice(),
        &[MissingRequirement::Dates(1)]
    );
    assert!(
        session
            .missing_requirements()
            .iter()
            .any(|missing| missing.to_string() == "1 more date(s)")
    );

    session.toggle_date(date(2026, 3, 10));

    assert!(session.is_valid());
    assert!(session.missing_requirements().is_empty());

    Ok(())
}

#[test]
fn discount_tiers_are_mutually_exclusive() -> TestResult {
    let mut session = oven_clean()?;

    resolve(&mut session, "member@example.com", true)?;

    // An active member cannot also take the signup tier.
    assert!(session.set_membership_addon(true).is_err());

    let breakdown = session.breakdown()?;

    assert_eq!(breakdown.tier, DiscountTier::ExistingMember);
    assert_eq!(breakdown.membership_fee.to_minor_units(), 0);

    Ok(())
}

#[test]
fn unknown_status_with_addon_is_not_discounted_until_resolved() -> TestResult {
    let mut session = oven_clean()?;

    session.set_membership_addon(true)?;

    assert_eq!(session.subscription_status(), SubscriptionStatus::Unknown);
    assert_eq!(session.breakdown()?.tier, DiscountTier::None);

    Ok(())
}

#[test]
fn intent_amount_matches_displayed_total() -> TestResult {
    let mut session = oven_clean()?;

    resolve(&mut session, "guest@example.com", false)?;
    session.set_membership_addon(true)?;

    session.set_full_name("Jane Smith");
    session.set_phone("07700900123");
    session.set_postcode("SW1A 1AA");
    session.set_city("London");
    session.set_terms_accepted(true);
    session.toggle_time_slot(TimeSlot::Early);
    session.toggle_date(date(2026, 3, 9));
    session.toggle_date(date(2026, 3, 10));

    let displayed = session.breakdown()?.order_total;
    let (_, request) = session.begin_intent_creation()?;

    assert_eq!(request.amount, displayed.to_minor_units());

    Ok(())
}

#[test]
fn multi_service_cart_is_priced_per_line_not_hourly() -> TestResult {
    let session = Fixture::from_set("multi-service")?.session(TODAY)?;
    let breakdown = session.breakdown()?;

    assert!(!breakdown.is_hourly());
    // 40.00 + 2 x 25.00 + 60.00 + 5.00 booking fee
    assert_eq!(breakdown.order_total, Money::from_minor(15_500, GBP));

    Ok(())
}

#[test]
fn hourly_total_uses_selected_hours() -> TestResult {
    let mut session = Fixture::from_set("handyman-hourly")?.session(TODAY)?;

    assert_eq!(session.hours(), 3);
    assert_eq!(session.breakdown()?.order_total, Money::from_minor(18_500, GBP));

    session.set_hours(0)?;

    assert_eq!(session.hours(), 1);
    assert_eq!(session.breakdown()?.order_total, Money::from_minor(6500, GBP));

    Ok(())
}

#[test]
fn lead_time_depends_on_membership() -> TestResult {
    let mut session = oven_clean()?;

    assert!(session.is_date_disabled(date(2026, 3, 3)));
    assert!(!session.is_date_disabled(date(2026, 3, 4)));
    assert_eq!(session.toggle_date(date(2026, 3, 3)), DateToggle::Disabled);

    resolve(&mut session, "member@example.com", true)?;

    assert_eq!(session.earliest_bookable(), date(2026, 3, 3));
    assert_eq!(session.toggle_date(date(2026, 3, 3)), DateToggle::Added);

    Ok(())
}

#[test]
fn sixth_date_is_capped() -> TestResult {
    let mut session = oven_clean()?;

    for day in 10..15 {
        assert_eq!(session.toggle_date(date(2026, 3, day)), DateToggle::Added);
    }

    assert_eq!(session.toggle_date(date(2026, 3, 20)), DateToggle::Capped);
    assert_eq!(session.booking().date_count(), 5);

    assert_eq!(session.toggle_date(date(2026, 3, 12)), DateToggle::Removed);
    assert_eq!(session.booking().date_count(), 4);

    Ok(())
}

#[test]
fn basket_in_other_currency_is_rejected() -> TestResult {
    let basket = Basket::with_items(
        [CartItem::single(
            ServiceRef::new("Import", Money::from_minor(4000, rusty_money::iso::USD))
                .with_price_type(PriceType::Fixed),
        )],
        rusty_money::iso::USD,
    )?;

    assert!(CheckoutSession::new(basket, PricingConfig::default(), TODAY).is_err());

    Ok(())
}
