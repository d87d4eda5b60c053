//! Booking
//!
//! The booking window collects the dates a customer is available and the arrival
//! slots they accept. Dates are bounded (at least two, at most five by default)
//! and may not fall inside the lead time.

use std::collections::BTreeSet;

use jiff::{ToSpan, civil::Date};
use thiserror::Error;

use crate::config::PricingConfig;

pub mod calendar;
pub mod slots;

pub use calendar::{CalendarDay, CalendarMonth};
pub use slots::{Period, TimeSlot};

/// Errors raised by the booking model.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A slot identifier did not match any known slot.
    #[error("unknown time slot: {0}")]
    UnknownSlot(String),

    /// Calendar arithmetic left the supported date range.
    #[error(transparent)]
    Calendar(#[from] jiff::Error),
}

/// What happened when a date was toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateToggle {
    /// The date was selected.
    Added,

    /// The date was deselected.
    Removed,

    /// The maximum number of dates is already selected; nothing changed.
    Capped,

    /// The date is inside the lead time; nothing changed.
    Disabled,
}

/// Selected dates and time slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingWindow {
    dates: BTreeSet<Date>,
    slots: BTreeSet<TimeSlot>,
    min_dates: usize,
    max_dates: usize,
}

impl Default for BookingWindow {
    fn default() -> Self {
        let config = PricingConfig::default();

        Self::new(config.min_dates, config.max_dates)
    }
}

impl BookingWindow {
    /// An empty window with the given date bounds.
    pub fn new(min_dates: usize, max_dates: usize) -> Self {
        Self {
            dates: BTreeSet::new(),
            slots: BTreeSet::new(),
            min_dates,
            max_dates,
        }
    }

    /// An empty window using the configured date bounds.
    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.min_dates, config.max_dates)
    }

    /// Select or deselect a date.
    ///
    /// Removing is always allowed. Adding is refused when the window is full or the
    /// date is before `earliest`.
    pub fn toggle_date(&mut self, day: Date, earliest: Date) -> DateToggle {
        if self.dates.remove(&day) {
            return DateToggle::Removed;
        }

        if self.dates.len() >= self.max_dates {
            return DateToggle::Capped;
        }

        if is_date_disabled(day, earliest) {
            return DateToggle::Disabled;
        }

        self.dates.insert(day);

        DateToggle::Added
    }

    /// Select or deselect a time slot. Returns whether the slot is now selected.
    pub fn toggle_time_slot(&mut self, slot: TimeSlot) -> bool {
        if self.slots.remove(&slot) {
            false
        } else {
            self.slots.insert(slot);
            true
        }
    }

    /// Selected dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.dates.iter().copied()
    }

    /// Selected slots, in time order.
    pub fn slots(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.slots.iter().copied()
    }

    /// Whether a date is selected.
    pub fn has_date(&self, day: Date) -> bool {
        self.dates.contains(&day)
    }

    /// Number of selected dates.
    pub fn date_count(&self) -> usize {
        self.dates.len()
    }

    /// Number of selected slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// How many more dates are needed to reach the minimum.
    pub fn dates_needed(&self) -> usize {
        self.min_dates.saturating_sub(self.dates.len())
    }

    /// Whether another date may be added.
    pub fn is_full(&self) -> bool {
        self.dates.len() >= self.max_dates
    }

    /// Enough dates and at least one slot.
    pub fn is_valid(&self) -> bool {
        self.dates_needed() == 0 && !self.slots.is_empty()
    }
}

/// Lead time in days: shorter for members and customers joining at checkout.
pub fn lead_days(is_member: bool, membership_addon: bool, config: &PricingConfig) -> i64 {
    if is_member || membership_addon {
        config.member_lead_days
    } else {
        config.standard_lead_days
    }
}

/// The first date that can be booked.
pub fn earliest_bookable(today: Date, lead_days: i64) -> Date {
    today.saturating_add(lead_days.days())
}

/// A date is disabled when it falls before the earliest bookable date.
pub fn is_date_disabled(date: Date, earliest: Date) -> bool {
    date < earliest
}
