//! Validation gate
//!
//! Payment can only start once every requirement below holds. The gate answers
//! both "may the customer pay?" and "what is still missing?", computed
//! independently of each other.

use std::fmt;

use smallvec::SmallVec;

use crate::{booking::BookingWindow, customer::CustomerDetails};

/// Checkbox agreements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Agreements {
    /// General terms and conditions
    pub terms: bool,

    /// Terms specific to hourly bookings
    pub hourly_terms: bool,
}

/// Something that still blocks payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRequirement {
    /// Full name
    FullName,
    /// A valid email
    Email,
    /// A valid phone number
    Phone,
    /// A postcode
    Postcode,
    /// Address line 1 or city
    Address,
    /// More dates (how many)
    Dates(usize),
    /// At least one time slot
    TimeSlot,
    /// Terms accepted
    Terms,
    /// Hourly terms accepted
    HourlyTerms,
    /// A job description for hourly work
    JobDescription,
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRequirement::FullName => f.write_str("Full name"),
            MissingRequirement::Email => f.write_str("Valid email"),
            MissingRequirement::Phone => f.write_str("Valid phone number"),
            MissingRequirement::Postcode => f.write_str("Postcode"),
            MissingRequirement::Address => f.write_str("Address or city"),
            MissingRequirement::Dates(n) => write!(f, "{n} more date(s)"),
            MissingRequirement::TimeSlot => f.write_str("Time slot"),
            MissingRequirement::Terms => f.write_str("Accept terms"),
            MissingRequirement::HourlyTerms => f.write_str("Accept hourly terms"),
            MissingRequirement::JobDescription => f.write_str("Job description"),
        }
    }
}

/// Everything the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    /// Customer details
    pub customer: &'a CustomerDetails,

    /// Selected dates and slots
    pub booking: &'a BookingWindow,

    /// Checkbox agreements
    pub agreements: Agreements,

    /// Whether the booking is hourly
    pub hourly: bool,

    /// Free-text description of the job
    pub job_description: &'a str,
}

impl ValidationInput<'_> {
    /// Whether payment may start.
    pub fn is_valid(&self) -> bool {
        let customer = self.customer;

        let hourly_ok =
            !self.hourly || (self.agreements.hourly_terms && !self.job_description.trim().is_empty());

        !customer.full_name.trim().is_empty()
            && customer.has_valid_email()
            && customer.has_valid_phone()
            && !customer.postcode.trim().is_empty()
            && customer.has_address()
            && self.booking.is_valid()
            && self.agreements.terms
            && hourly_ok
    }

    /// Unmet requirements, in form order.
    pub fn missing(&self) -> SmallVec<[MissingRequirement; 10]> {
        let customer = self.customer;
        let mut missing = SmallVec::new();

        if customer.full_name.trim().is_empty() {
            missing.push(MissingRequirement::FullName);
        }

        if !customer.has_valid_email() {
            missing.push(MissingRequirement::Email);
        }

        if !customer.has_valid_phone() {
            missing.push(MissingRequirement::Phone);
        }

        if customer.postcode.trim().is_empty() {
            missing.push(MissingRequirement::Postcode);
        }

        if !customer.has_address() {
            missing.push(MissingRequirement::Address);
        }

        match self.booking.dates_needed() {
            0 => {}
            n => missing.push(MissingRequirement::Dates(n)),
        }

        if self.booking.slot_count() == 0 {
            missing.push(MissingRequirement::TimeSlot);
        }

        if !self.agreements.terms {
            missing.push(MissingRequirement::Terms);
        }

        if self.hourly {
            if !self.agreements.hourly_terms {
                missing.push(MissingRequirement::HourlyTerms);
            }

            if self.job_description.trim().is_empty() {
                missing.push(MissingRequirement::JobDescription);
            }
        }

        missing
    }
}
