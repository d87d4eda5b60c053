//! Express checkout prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    backend::{BackendError, FunctionsClient},
    basket::{Basket, BasketError},
    booking::{BookingError, BookingWindow, CalendarDay, CalendarMonth, DateToggle, Period, TimeSlot},
    config::{ConfigError, EndpointConfig, PricingConfig},
    customer::{CustomerDetails, Field, FieldError},
    discounts::{AppliedDiscount, DiscountEligibility, DiscountError, DiscountTier},
    items::{CartItem, ItemError},
    logging::{LogFormat, LoggingError},
    payments::{
        ClientSecret, CreateTicket, IntentRequest, IntentStatus, PaymentError, PaymentIntent,
        PaymentIntentState, PaymentLifecycle, PaymentProcessor, ProcessorError,
        VerificationOutcome, http::StripeProcessor,
    },
    postcode::{PostcodeLookup, PostcodeMatch, PostcodesIoClient},
    prices::{Price, parse_price},
    receipt::{PriceBreakdown, ReceiptError},
    services::{PriceType, ServiceRef},
    session::{CheckoutError, CheckoutSession, Confirmation},
    subscription::{LookupError, LookupTicket, SubscriptionLookup, SubscriptionStatus},
    tracking::{AbandonedCheckout, AbandonmentTracker, TrackingError},
    validation::{Agreements, MissingRequirement},
};
