//! Calendar month navigation.

use jiff::{ToSpan, civil::Date};

use super::{BookingError, is_date_disabled};

/// A day shown in the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    /// The date
    pub date: Date,

    /// Whether the date is before the earliest bookable date
    pub disabled: bool,
}

/// The month currently displayed. Navigation never touches the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMonth {
    first: Date,
    earliest_month: Date,
}

impl CalendarMonth {
    /// The month containing `today`.
    pub fn current(today: Date) -> Self {
        let first = today.first_of_month();

        Self {
            first,
            earliest_month: first,
        }
    }

    /// First day of the displayed month.
    pub fn first_day(&self) -> Date {
        self.first
    }

    /// Year and month displayed.
    pub fn year_month(&self) -> (i16, i8) {
        (self.first.year(), self.first.month())
    }

    /// Move to the following month.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Calendar`] past the end of the supported range.
    pub fn next(&mut self) -> Result<(), BookingError> {
        self.first = self.first.checked_add(1.month())?;

        Ok(())
    }

    /// Move to the previous month, unless that would go before the current month.
    ///
    /// Returns whether the month changed.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Calendar`] before the start of the supported range.
    pub fn previous(&mut self) -> Result<bool, BookingError> {
        if self.first <= self.earliest_month {
            return Ok(false);
        }

        self.first = self.first.checked_sub(1.month())?;

        Ok(true)
    }

    /// Every day of the displayed month, flagged against the earliest bookable date.
    pub fn days(&self, earliest: Date) -> Vec<CalendarDay> {
        let last = self.first.last_of_month();

        self.first
            .series(1.day())
            .take_while(|date| *date <= last)
            .map(|date| CalendarDay {
                date,
                disabled: is_date_disabled(date, earliest),
            })
            .collect()
    }
}
