//! Checkout session
//!
//! [`CheckoutSession`] owns everything one checkout needs: the basket, the booking
//! window, customer details, agreements, membership state and the payment
//! lifecycle. The order total is computed in exactly one place,
//! [`CheckoutSession::breakdown`], and both the summary and the payment intent use
//! it.

use std::{collections::BTreeMap, sync::Arc};

use jiff::civil::Date;
use rustc_hash::FxHashSet;
use rusty_money::Money;
use smallvec::SmallVec;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    basket::{Basket, BasketError},
    booking::{
        BookingError, BookingWindow, CalendarDay, CalendarMonth, DateToggle, TimeSlot,
        earliest_bookable, is_date_disabled, lead_days,
    },
    config::PricingConfig,
    customer::{CustomerDetails, Field, FieldError, is_uk_postcode, mask_email},
    discounts::DiscountEligibility,
    payments::{
        BookingData, CreateTicket, CreatedIntent, IntentRequest, PaymentError, PaymentIntent,
        PaymentIntentState, PaymentLifecycle, PaymentProcessor, ProcessorError,
        VerificationOutcome,
    },
    postcode::{PostcodeLookup, PostcodeMatch},
    prices::{Price, to_decimal},
    receipt::{PriceBreakdown, ReceiptError},
    subscription::{
        LookupError, LookupTicket, SubscriptionLookup, SubscriptionResolver, SubscriptionStatus,
    },
    tracking::{AbandonedCheckout, AbandonmentTracker, report_abandonment},
    validation::{Agreements, MissingRequirement, ValidationInput},
};

/// Tags intents created by this checkout so webhooks can tell them apart.
const INTENT_SOURCE: &str = "website";

/// Errors raised by checkout session operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The basket has no services.
    #[error("the basket is empty")]
    EmptyBasket,

    /// The membership add-on was requested by an existing member.
    #[error("this email already holds an active membership")]
    AlreadyMember,

    /// Basket construction error.
    #[error(transparent)]
    Basket(#[from] BasketError),

    /// Price calculation error.
    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    /// Booking error.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// Payment lifecycle error.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Summary shown once payment has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    /// Intent that was paid
    pub intent_id: String,

    /// Service label
    pub service_label: String,

    /// Amount charged
    pub amount: Price,

    /// Normalized customer email
    pub email: String,

    /// Postal address on one line
    pub address: String,

    /// Dates offered
    pub dates: Vec<Date>,

    /// Arrival slots offered
    pub slots: Vec<TimeSlot>,
}

/// State of one checkout.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    id: Uuid,
    config: PricingConfig,
    today: Date,
    basket: Basket,
    hours: u32,
    booking: BookingWindow,
    calendar: CalendarMonth,
    customer: CustomerDetails,
    agreements: Agreements,
    job_description: String,
    membership_addon: bool,
    subscription: SubscriptionResolver,
    payment: PaymentLifecycle,
    abandonment_reported: FxHashSet<String>,
}

impl CheckoutSession {
    /// Start a checkout for a basket.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyBasket`]: the basket has no services.
    /// - [`CheckoutError::Basket`]: the basket is not priced in the configured currency.
    pub fn new(basket: Basket, config: PricingConfig, today: Date) -> Result<Self, CheckoutError> {
        if basket.is_empty() {
            return Err(CheckoutError::EmptyBasket);
        }

        if basket.currency() != config.currency {
            return Err(BasketError::CurrencyMismatch(
                0,
                basket.currency().iso_alpha_code,
                config.currency.iso_alpha_code,
            )
            .into());
        }

        let hours = basket
            .hourly_service()
            .and_then(|service| service.hours)
            .unwrap_or(1)
            .max(1);

        let id = Uuid::now_v7();

        info!(session = %id, services = basket.len(), hourly = basket.is_hourly(), "checkout started");

        Ok(Self {
            id,
            booking: BookingWindow::from_config(&config),
            calendar: CalendarMonth::current(today),
            config,
            today,
            basket,
            hours,
            customer: CustomerDetails::default(),
            agreements: Agreements::default(),
            job_description: String::new(),
            membership_addon: false,
            subscription: SubscriptionResolver::default(),
            payment: PaymentLifecycle::default(),
            abandonment_reported: FxHashSet::default(),
        })
    }

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Pricing configuration.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// The basket.
    pub fn basket(&self) -> &Basket {
        &self.basket
    }

    /// Customer details.
    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    /// Selected dates and slots.
    pub fn booking(&self) -> &BookingWindow {
        &self.booking
    }

    /// Displayed calendar month.
    pub fn calendar(&self) -> &CalendarMonth {
        &self.calendar
    }

    /// Payment lifecycle.
    pub fn payment(&self) -> &PaymentLifecycle {
        &self.payment
    }

    /// Membership status of the entered email.
    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.subscription.status()
    }

    /// Whether the membership add-on is opted in.
    pub fn membership_addon(&self) -> bool {
        self.membership_addon
    }

    /// Hours booked (hourly bookings only).
    pub fn hours(&self) -> u32 {
        self.hours
    }

    // Customer details

    /// Set the full name.
    pub fn set_full_name(&mut self, name: impl Into<String>) {
        self.customer.full_name = name.into();
    }

    /// Set the email; returns a lookup ticket when the new email is valid.
    ///
    /// The previous membership status is discarded.
    pub fn set_email(&mut self, email: impl Into<String>) -> Option<LookupTicket> {
        self.customer.email = email.into();

        let ticket = self.subscription.email_changed(&self.customer.email);

        self.sync_intent();

        ticket
    }

    /// Set the phone number.
    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.customer.phone = phone.into();
    }

    /// Set the postcode.
    pub fn set_postcode(&mut self, postcode: impl Into<String>) {
        self.customer.postcode = postcode.into();
    }

    /// Set the first address line.
    pub fn set_address_line1(&mut self, line: impl Into<String>) {
        self.customer.address_line1 = line.into();
    }

    /// Set the second address line.
    pub fn set_address_line2(&mut self, line: impl Into<String>) {
        self.customer.address_line2 = line.into();
    }

    /// Set the town or city.
    pub fn set_city(&mut self, city: impl Into<String>) {
        self.customer.city = city.into();
    }

    /// Set the job description.
    pub fn set_job_description(&mut self, description: impl Into<String>) {
        self.job_description = description.into();
    }

    /// Accept or withdraw the terms.
    pub fn set_terms_accepted(&mut self, accepted: bool) {
        self.agreements.terms = accepted;
    }

    /// Accept or withdraw the hourly terms.
    pub fn set_hourly_terms_accepted(&mut self, accepted: bool) {
        self.agreements.hourly_terms = accepted;
    }

    /// Set the hours for an hourly booking, clamped to at least one.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Locked`] while a payment is being confirmed.
    pub fn set_hours(&mut self, hours: u32) -> Result<(), CheckoutError> {
        if !self.payment.state().is_mutable() {
            return Err(PaymentError::Locked.into());
        }

        self.hours = hours.max(1);
        self.sync_intent();

        Ok(())
    }

    // Membership

    /// Commit a membership lookup result.
    ///
    /// When the email turns out to hold an active membership the add-on is switched
    /// off. Returns the new status, or `None` for a stale ticket.
    pub fn apply_subscription(
        &mut self,
        ticket: &LookupTicket,
        result: Result<bool, LookupError>,
    ) -> Option<SubscriptionStatus> {
        let status = self.subscription.apply(ticket, result)?;

        if status == SubscriptionStatus::Active && self.membership_addon {
            info!(session = %self.id, "existing member, membership add-on switched off");

            if let Err(err) = self.payment.invalidate() {
                warn!(session = %self.id, error = %err, "payment already in progress while switching off add-on");
            }

            self.membership_addon = false;
        }

        self.sync_intent();

        Some(status)
    }

    /// Change the email and resolve its membership status.
    pub async fn update_email(
        &mut self,
        email: impl Into<String>,
        lookup: &dyn SubscriptionLookup,
    ) -> SubscriptionStatus {
        let Some(ticket) = self.set_email(email) else {
            return self.subscription.status();
        };

        debug!(session = %self.id, email = %mask_email(ticket.email()), "checking membership");

        let result = lookup.check_status(ticket.email()).await;

        self.apply_subscription(&ticket, result);

        self.subscription.status()
    }

    /// Opt in or out of the membership add-on.
    ///
    /// Any prepared payment is discarded so the next one uses the new total.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::AlreadyMember`]: opting in with an active membership.
    /// - [`PaymentError::Locked`]: a payment is being confirmed.
    pub fn set_membership_addon(&mut self, on: bool) -> Result<(), CheckoutError> {
        if on && self.subscription.status() == SubscriptionStatus::Active {
            return Err(CheckoutError::AlreadyMember);
        }

        if on == self.membership_addon {
            return Ok(());
        }

        self.payment.invalidate()?;
        self.membership_addon = on;

        debug!(session = %self.id, on, "membership add-on toggled");

        Ok(())
    }

    // Booking

    /// Lead time for this customer.
    pub fn lead_days(&self) -> i64 {
        lead_days(
            self.subscription.status() == SubscriptionStatus::Active,
            self.membership_addon,
            &self.config,
        )
    }

    /// First bookable date.
    pub fn earliest_bookable(&self) -> Date {
        earliest_bookable(self.today, self.lead_days())
    }

    /// Whether a date is inside the lead time.
    pub fn is_date_disabled(&self, date: Date) -> bool {
        is_date_disabled(date, self.earliest_bookable())
    }

    /// Select or deselect a date.
    pub fn toggle_date(&mut self, date: Date) -> DateToggle {
        let earliest = self.earliest_bookable();

        self.booking.toggle_date(date, earliest)
    }

    /// Select or deselect a time slot; returns whether it is now selected.
    pub fn toggle_time_slot(&mut self, slot: TimeSlot) -> bool {
        self.booking.toggle_time_slot(slot)
    }

    /// Show the following month.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Calendar`] past the supported date range.
    pub fn next_month(&mut self) -> Result<(), CheckoutError> {
        Ok(self.calendar.next()?)
    }

    /// Show the previous month; returns whether the month changed.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Calendar`] before the supported date range.
    pub fn previous_month(&mut self) -> Result<bool, CheckoutError> {
        Ok(self.calendar.previous()?)
    }

    /// Days of the displayed month with their disabled flag.
    pub fn calendar_days(&self) -> Vec<CalendarDay> {
        self.calendar.days(self.earliest_bookable())
    }

    // Pricing and validation

    /// Inputs to the discount tier.
    pub fn discount_eligibility(&self) -> DiscountEligibility {
        DiscountEligibility {
            status: self.subscription.status(),
            email_valid: self.customer.has_valid_email(),
            membership_addon: self.membership_addon,
        }
    }

    /// The price of this checkout.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if money arithmetic overflows.
    pub fn breakdown(&self) -> Result<PriceBreakdown, ReceiptError> {
        PriceBreakdown::compute(
            &self.basket,
            self.hours,
            &self.discount_eligibility(),
            &self.config,
        )
    }

    /// Validation gate over the current state.
    pub fn validation(&self) -> ValidationInput<'_> {
        ValidationInput {
            customer: &self.customer,
            booking: &self.booking,
            agreements: self.agreements,
            hourly: self.basket.is_hourly(),
            job_description: &self.job_description,
        }
    }

    /// Whether payment may start.
    pub fn is_valid(&self) -> bool {
        self.validation().is_valid()
    }

    /// What still blocks payment.
    pub fn missing_requirements(&self) -> SmallVec<[MissingRequirement; 10]> {
        self.validation().missing()
    }

    /// Inline errors for the customer fields.
    pub fn field_errors(&self) -> Vec<(Field, FieldError)> {
        self.customer.field_errors()
    }

    // Payment

    /// Start creating a payment intent for the current total.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::FormIncomplete`]: the validation gate is closed.
    /// - [`PaymentError::InvalidMembershipEmail`]: the add-on is on without a valid email.
    /// - [`CheckoutError::Receipt`]: the total cannot be computed.
    /// - Any error from [`PaymentLifecycle::begin_create`].
    pub fn begin_intent_creation(&mut self) -> Result<(CreateTicket, IntentRequest), CheckoutError> {
        if !self.is_valid() {
            return Err(PaymentError::FormIncomplete.into());
        }

        let Some(email) = self.customer.normalized_email() else {
            return Err(if self.membership_addon {
                PaymentError::InvalidMembershipEmail
            } else {
                PaymentError::FormIncomplete
            }
            .into());
        };

        let breakdown = self.breakdown()?;

        let ticket = self
            .payment
            .begin_create(breakdown.amount_minor(), self.config.max_amount.to_minor_units())?;

        let request = self.intent_request(&breakdown, email);

        Ok((ticket, request))
    }

    /// Finish an intent creation.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Processor`] if creation failed.
    pub fn complete_intent_creation(
        &mut self,
        ticket: CreateTicket,
        result: Result<CreatedIntent, ProcessorError>,
    ) -> Result<Option<PaymentIntent>, CheckoutError> {
        Ok(self.payment.complete_create(ticket, result)?)
    }

    /// Create a payment intent for the current total.
    ///
    /// Returns `None` if the creation was superseded while in flight.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_intent_creation`] and [`Self::complete_intent_creation`].
    pub async fn create_payment_intent(
        &mut self,
        processor: &dyn PaymentProcessor,
    ) -> Result<Option<PaymentIntent>, CheckoutError> {
        let (ticket, request) = self.begin_intent_creation()?;

        let result = processor.create_intent(&request).await;

        self.complete_intent_creation(ticket, result)
    }

    /// Confirm and verify the payment.
    ///
    /// The intent is only confirmed when it was created for the current total;
    /// otherwise it is discarded and [`PaymentError::StaleAmount`] is returned.
    ///
    /// # Errors
    ///
    /// Returns an error for a stale or missing intent, or a failed confirmation.
    pub async fn confirm_payment(
        &mut self,
        processor: &dyn PaymentProcessor,
    ) -> Result<VerificationOutcome, CheckoutError> {
        let amount = self.breakdown()?.amount_minor();

        if let PaymentIntentState::Created { intent } = self.payment.state() {
            if intent.amount_minor != amount {
                warn!(
                    session = %self.id,
                    intent_id = %intent.id,
                    intent_amount = intent.amount_minor,
                    amount,
                    "order total changed since the intent was created"
                );

                self.payment.invalidate()?;

                return Err(PaymentError::StaleAmount.into());
            }
        }

        Ok(self.payment.confirm(processor, self.config.poll_delay).await?)
    }

    /// Summary of a successful payment.
    pub fn confirmation(&self) -> Option<Confirmation> {
        let PaymentIntentState::Succeeded { intent } = self.payment.state() else {
            return None;
        };

        Some(Confirmation {
            intent_id: intent.id.clone(),
            service_label: self.basket.label(),
            amount: Money::from_minor(intent.amount_minor, self.config.currency),
            email: self
                .customer
                .normalized_email()
                .unwrap_or_else(|| self.customer.email.trim().to_string()),
            address: self.customer.address(),
            dates: self.booking.dates().collect(),
            slots: self.booking.slots().collect(),
        })
    }

    // Abandonment

    /// The report to send if the customer leaves now, if one is due.
    pub fn abandonment_report(&self) -> Option<AbandonedCheckout> {
        let state = self.payment.state();

        if state.is_succeeded() {
            return None;
        }

        let intent = state.intent()?;

        if self.abandonment_reported.contains(&intent.id) {
            return None;
        }

        let email = self
            .customer
            .normalized_email()
            .unwrap_or_else(|| self.customer.email.trim().to_string());

        if email.is_empty() {
            return None;
        }

        let amount = Money::from_minor(intent.amount_minor, self.config.currency);

        Some(AbandonedCheckout {
            email,
            name: self.customer.full_name.trim().to_string(),
            service_label: self.basket.label(),
            amount: to_decimal(&amount),
            intent_id: intent.id.clone(),
        })
    }

    /// Report the checkout as abandoned on a detached task, at most once per intent.
    pub fn notify_abandonment(
        &mut self,
        tracker: Arc<dyn AbandonmentTracker>,
    ) -> Option<JoinHandle<()>> {
        let report = self.abandonment_report()?;

        self.abandonment_reported.insert(report.intent_id.clone());

        report_abandonment(tracker, report)
    }

    // Postcode

    /// Look up the postcode and prefill the city. Failures are logged and ignored.
    ///
    /// Postcodes that do not look like UK postcodes are not looked up.
    pub async fn lookup_postcode(&mut self, lookup: &dyn PostcodeLookup) -> Option<PostcodeMatch> {
        if !is_uk_postcode(&self.customer.postcode) {
            return None;
        }

        match lookup.lookup(&self.customer.postcode).await {
            Ok(Some(found)) => {
                self.apply_postcode_match(&found);

                Some(found)
            }
            Ok(None) => None,
            Err(err) => {
                debug!(session = %self.id, error = %err, "postcode lookup failed");

                None
            }
        }
    }

    /// Prefill the city from a lookup, unless one was already entered.
    ///
    /// Returns whether the city was filled.
    pub fn apply_postcode_match(&mut self, found: &PostcodeMatch) -> bool {
        if !self.customer.city.trim().is_empty() {
            return false;
        }

        self.customer.city.clone_from(&found.city);

        true
    }

    fn intent_request(&self, breakdown: &PriceBreakdown, email: String) -> IntentRequest {
        let label = self.basket.label();
        let customer = &self.customer;

        let mut metadata = BTreeMap::from([
            ("service".to_string(), label.clone()),
            ("customer_name".to_string(), customer.full_name.trim().to_string()),
            ("membership_addon".to_string(), self.membership_addon.to_string()),
            ("discount_tier".to_string(), format!("{:?}", breakdown.tier)),
            ("session_id".to_string(), self.id.to_string()),
            ("source".to_string(), INTENT_SOURCE.to_string()),
        ]);

        if let Some(charge) = &breakdown.hourly {
            metadata.insert("hours".to_string(), charge.hours.to_string());
        }

        let optional = |value: &str| {
            let value = value.trim();

            (!value.is_empty()).then(|| value.to_string())
        };

        let booking_data = BookingData {
            customer_name: customer.full_name.trim().to_string(),
            customer_email: email.clone(),
            customer_phone: customer.phone.trim().to_string(),
            address_line1: optional(&customer.address_line1),
            address_line2: optional(&customer.address_line2),
            city: optional(&customer.city),
            postcode: crate::customer::normalize_postcode(&customer.postcode),
            service_name: label,
            service_category: self
                .basket
                .iter()
                .find_map(|item| item.service().category.clone()),
            job_description: optional(&self.job_description),
            scheduled_dates: self.booking.dates().collect(),
            scheduled_time_slots: self.booking.slots().collect(),
        };

        IntentRequest {
            amount: breakdown.amount_minor(),
            currency: self.config.currency.iso_alpha_code.to_lowercase(),
            customer_email: email,
            metadata,
            booking_data,
            idempotency_key: Uuid::now_v7(),
        }
    }

    /// Discard a prepared intent whose amount no longer matches the total.
    fn sync_intent(&mut self) {
        let Some(pending) = self.payment.pending_amount() else {
            return;
        };

        let current = self.breakdown().ok().map(|breakdown| breakdown.amount_minor());

        if current == Some(pending) {
            return;
        }

        match self.payment.invalidate() {
            Ok(_) => debug!(session = %self.id, "order total changed, payment intent discarded"),
            Err(_) => debug!(session = %self.id, "order total changed during confirmation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        payments::{ClientSecret, IntentSnapshot, IntentStatus, MockPaymentProcessor},
        postcode::{MockPostcodeLookup, PostcodeError},
        services::{PriceType, ServiceRef},
        subscription::MockSubscriptionLookup,
        tracking::MockAbandonmentTracker,
    };

    use super::*;

    const TODAY: Date = date(2026, 6, 1);

    fn session() -> Result<CheckoutSession, CheckoutError> {
        CheckoutSession::new(
            Basket::from_service(ServiceRef::new("Oven clean", Money::from_minor(4000, GBP))),
            PricingConfig::default(),
            TODAY,
        )
    }

    fn complete(session: &mut CheckoutSession) {
        session.set_full_name("Jane Smith");
        session.set_email("jane@example.com");
        session.set_phone("07700 900123");
        session.set_postcode("SW1A 1AA");
        session.set_city("London");
        session.set_terms_accepted(true);
        session.toggle_date(date(2026, 6, 10));
        session.toggle_date(date(2026, 6, 11));
        session.toggle_time_slot(TimeSlot::Early);
    }

    fn created() -> CreatedIntent {
        CreatedIntent {
            id: "pi_1".to_string(),
            client_secret: ClientSecret::new("pi_1_secret_x"),
        }
    }

    #[test]
    fn empty_basket_is_rejected() {
        let result = CheckoutSession::new(Basket::new(GBP), PricingConfig::default(), TODAY);

        assert!(matches!(result, Err(CheckoutError::EmptyBasket)));
    }

    #[test]
    fn hourly_session_starts_with_service_hours() -> TestResult {
        let basket = Basket::from_service(
            ServiceRef::new("Handyman", Money::from_minor(6000, GBP))
                .with_price_type(PriceType::Hourly)
                .with_hours(3),
        );

        let session = CheckoutSession::new(basket, PricingConfig::default(), TODAY)?;

        assert_eq!(session.hours(), 3);
        assert_eq!(session.breakdown()?.order_total, Money::from_minor(18_500, GBP));

        Ok(())
    }

    #[test]
    fn addon_shortens_lead_time() -> TestResult {
        let mut session = session()?;

        assert!(session.is_date_disabled(date(2026, 6, 2)));

        session.set_membership_addon(true)?;

        assert!(!session.is_date_disabled(date(2026, 6, 2)));
        assert_eq!(session.toggle_date(date(2026, 6, 2)), DateToggle::Added);

        Ok(())
    }

    #[test]
    fn active_member_cannot_opt_into_addon() -> TestResult {
        let mut session = session()?;
        let ticket = session.set_email("jane@example.com").ok_or("no ticket")?;

        session.apply_subscription(&ticket, Ok(true));

        assert!(matches!(
            session.set_membership_addon(true),
            Err(CheckoutError::AlreadyMember)
        ));

        Ok(())
    }

    #[test]
    fn active_status_forces_addon_off_and_clears_intent() -> TestResult {
        let mut session = session()?;
        complete(&mut session);

        let ticket = session.set_email("jane@example.com").ok_or("no ticket")?;
        session.apply_subscription(&ticket, Ok(false));
        session.set_membership_addon(true)?;

        let (create, _) = session.begin_intent_creation()?;
        session.complete_intent_creation(create, Ok(created()))?;

        let ticket = session.set_email("jane@example.com").ok_or("no ticket")?;
        session.apply_subscription(&ticket, Ok(true));

        assert!(!session.membership_addon());
        assert_eq!(session.payment().state(), &PaymentIntentState::None);

        Ok(())
    }

    #[test]
    fn incomplete_form_cannot_create_intent() -> TestResult {
        let mut session = session()?;

        let result = session.begin_intent_creation();

        assert!(matches!(
            result,
            Err(CheckoutError::Payment(PaymentError::FormIncomplete))
        ));

        Ok(())
    }

    #[test]
    fn intent_request_uses_breakdown_amount() -> TestResult {
        let mut session = session()?;
        complete(&mut session);

        let ticket = session.set_email("jane@example.com").ok_or("no ticket")?;
        session.apply_subscription(&ticket, Ok(false));
        session.set_membership_addon(true)?;

        let (create, request) = session.begin_intent_creation()?;

        assert_eq!(request.amount, 4284);
        assert_eq!(create.amount_minor(), session.breakdown()?.amount_minor());
        assert_eq!(request.currency, "gbp");
        assert_eq!(request.metadata.get("membership_addon").map(String::as_str), Some("true"));
        assert_eq!(request.metadata.get("source").map(String::as_str), Some("website"));
        assert_eq!(request.booking_data.scheduled_dates.len(), 2);
        assert_eq!(request.booking_data.city.as_deref(), Some("London"));

        Ok(())
    }

    #[test]
    fn addon_toggle_invalidates_intent() -> TestResult {
        let mut session = session()?;
        complete(&mut session);

        let (create, _) = session.begin_intent_creation()?;
        session.complete_intent_creation(create, Ok(created()))?;

        session.set_membership_addon(true)?;

        assert_eq!(session.payment().state(), &PaymentIntentState::None);

        Ok(())
    }

    #[tokio::test]
    async fn stale_intent_is_not_confirmed() -> TestResult {
        let mut processor = MockPaymentProcessor::new();
        processor.expect_confirm().never();
        processor.expect_retrieve().never();

        let basket = Basket::from_service(
            ServiceRef::new("Handyman", Money::from_minor(6000, GBP))
                .with_price_type(PriceType::Hourly),
        );
        let mut session = CheckoutSession::new(basket, PricingConfig::default(), TODAY)?;
        complete(&mut session);
        session.set_hourly_terms_accepted(true);
        session.set_job_description("Hang three doors");

        let (create, _) = session.begin_intent_creation()?;
        session.complete_intent_creation(create, Ok(created()))?;

        // Bypass the setter to simulate a total drifting behind the intent's back.
        session.hours = 4;

        let result = session.confirm_payment(&processor).await;

        assert!(matches!(
            result,
            Err(CheckoutError::Payment(PaymentError::StaleAmount))
        ));
        assert_eq!(session.payment().state(), &PaymentIntentState::None);

        Ok(())
    }

    #[test]
    fn changing_hours_discards_intent() -> TestResult {
        let basket = Basket::from_service(
            ServiceRef::new("Handyman", Money::from_minor(6000, GBP))
                .with_price_type(PriceType::Hourly),
        );
        let mut session = CheckoutSession::new(basket, PricingConfig::default(), TODAY)?;
        complete(&mut session);
        session.set_hourly_terms_accepted(true);
        session.set_job_description("Hang three doors");

        let (create, _) = session.begin_intent_creation()?;
        session.complete_intent_creation(create, Ok(created()))?;

        session.set_hours(2)?;

        assert_eq!(session.payment().state(), &PaymentIntentState::None);

        Ok(())
    }

    #[tokio::test]
    async fn successful_payment_produces_confirmation() -> TestResult {
        let mut processor = MockPaymentProcessor::new();

        processor
            .expect_create_intent()
            .once()
            .withf(|request| request.amount == 4500)
            .returning(|_| Ok(created()));
        processor.expect_confirm().once().returning(|_| {
            Ok(IntentSnapshot {
                id: "pi_1".to_string(),
                status: IntentStatus::Succeeded,
            })
        });
        processor.expect_retrieve().once().returning(|_| {
            Ok(IntentSnapshot {
                id: "pi_1".to_string(),
                status: IntentStatus::Succeeded,
            })
        });

        let mut session = session()?;
        complete(&mut session);

        session.create_payment_intent(&processor).await?;
        session.confirm_payment(&processor).await?;

        let confirmation = session.confirmation().ok_or("no confirmation")?;

        assert_eq!(confirmation.amount, Money::from_minor(4500, GBP));
        assert_eq!(confirmation.email, "jane@example.com");
        assert_eq!(confirmation.address, "London, SW1A 1AA");
        assert!(session.abandonment_report().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn update_email_resolves_status() -> TestResult {
        let mut lookup = MockSubscriptionLookup::new();

        lookup.expect_check_status().once().returning(|_| Ok(true));

        let mut session = session()?;

        let status = session.update_email("Jane@Example.com", &lookup).await;

        assert_eq!(status, SubscriptionStatus::Active);
        assert_eq!(session.breakdown()?.order_total, Money::from_minor(4050, GBP));

        Ok(())
    }

    #[tokio::test]
    async fn abandonment_is_reported_once_per_intent() -> TestResult {
        let mut tracker = MockAbandonmentTracker::new();

        tracker
            .expect_track()
            .once()
            .withf(|checkout| checkout.intent_id == "pi_1" && checkout.amount.to_string() == "45.00")
            .returning(|_| Ok(()));

        let tracker: Arc<dyn AbandonmentTracker> = Arc::new(tracker);

        let mut session = session()?;
        complete(&mut session);

        let (create, _) = session.begin_intent_creation()?;
        session.complete_intent_creation(create, Ok(created()))?;

        let handle = session.notify_abandonment(Arc::clone(&tracker)).ok_or("no report")?;
        handle.await?;

        assert!(session.notify_abandonment(tracker).is_none());

        Ok(())
    }

    #[test]
    fn no_abandonment_without_intent() -> TestResult {
        let mut session = session()?;
        complete(&mut session);

        assert!(session.abandonment_report().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn postcode_prefills_empty_city_only() -> TestResult {
        let mut lookup = MockPostcodeLookup::new();

        lookup.expect_lookup().times(2).returning(|_| {
            Ok(Some(PostcodeMatch {
                postcode: "SW1A 1AA".to_string(),
                city: "Westminster".to_string(),
            }))
        });

        let mut session = session()?;
        session.set_postcode("sw1a 1aa");

        session.lookup_postcode(&lookup).await;
        assert_eq!(session.customer().city, "Westminster");

        session.set_city("London");
        session.lookup_postcode(&lookup).await;
        assert_eq!(session.customer().city, "London");

        Ok(())
    }

    #[tokio::test]
    async fn postcode_failure_is_ignored() -> TestResult {
        let mut lookup = MockPostcodeLookup::new();

        lookup
            .expect_lookup()
            .once()
            .returning(|_| Err(PostcodeError::Status(503)));

        let mut session = session()?;
        session.set_postcode("SW1A 1AA");

        assert!(session.lookup_postcode(&lookup).await.is_none());
        assert!(session.customer().city.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn malformed_postcode_is_not_looked_up() -> TestResult {
        let mut lookup = MockPostcodeLookup::new();

        lookup.expect_lookup().never();

        let mut session = session()?;
        session.set_postcode("12345");

        assert!(session.lookup_postcode(&lookup).await.is_none());
        assert!(session.customer().city.is_empty());

        Ok(())
    }

    #[test]
    fn calendar_cannot_precede_current_month() -> TestResult {
        let mut session = session()?;

        assert!(!session.previous_month()?);

        session.next_month()?;

        assert_eq!(session.calendar().year_month(), (2026, 7));
        assert!(session.calendar_days().iter().all(|day| !day.disabled));

        Ok(())
    }
}
