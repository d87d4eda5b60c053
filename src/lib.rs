//! Express Checkout
//!
//! Pricing and booking-state engine for a home-services checkout: a service cart,
//! date and time-slot selection, a two-tier membership discount, VAT-inclusive
//! totals and a payment intent lifecycle that distrusts the processor's
//! confirmation until it has re-checked the intent itself.
//!
//! [`session::CheckoutSession`] ties the pieces together and is the only place the
//! order total is computed.

pub mod backend;
pub mod basket;
pub mod booking;
pub mod config;
pub mod customer;
pub mod discounts;
pub mod fixtures;
pub mod items;
pub mod logging;
pub mod payments;
pub mod postcode;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod receipt;
pub mod services;
pub mod session;
pub mod subscription;
pub mod tracking;
pub mod utils;
pub mod validation;
