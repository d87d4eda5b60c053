//! Time slots

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::BookingError;

/// Part of the day a slot falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    /// 08:00 to 12:00
    Morning,
    /// 12:00 to 16:00
    Afternoon,
    /// 16:00 to 20:00
    Evening,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::Evening => "Evening",
        })
    }
}

/// One of the six two-hour arrival windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeSlot {
    /// 08:00 to 10:00
    Early,
    /// 10:00 to 12:00
    LateMorning,
    /// 12:00 to 14:00
    Midday,
    /// 14:00 to 16:00
    MidAfternoon,
    /// 16:00 to 18:00
    EarlyEvening,
    /// 18:00 to 20:00
    LateEvening,
}

impl TimeSlot {
    /// Every slot, in time order.
    pub const ALL: [TimeSlot; 6] = [
        TimeSlot::Early,
        TimeSlot::LateMorning,
        TimeSlot::Midday,
        TimeSlot::MidAfternoon,
        TimeSlot::EarlyEvening,
        TimeSlot::LateEvening,
    ];

    /// Start hour (24h clock).
    pub fn start_hour(self) -> u8 {
        match self {
            TimeSlot::Early => 8,
            TimeSlot::LateMorning => 10,
            TimeSlot::Midday => 12,
            TimeSlot::MidAfternoon => 14,
            TimeSlot::EarlyEvening => 16,
            TimeSlot::LateEvening => 18,
        }
    }

    /// End hour (24h clock).
    pub fn end_hour(self) -> u8 {
        self.start_hour() + 2
    }

    /// Stable identifier, e.g. `"08-10"`.
    pub fn id(self) -> &'static str {
        match self {
            TimeSlot::Early => "08-10",
            TimeSlot::LateMorning => "10-12",
            TimeSlot::Midday => "12-14",
            TimeSlot::MidAfternoon => "14-16",
            TimeSlot::EarlyEvening => "16-18",
            TimeSlot::LateEvening => "18-20",
        }
    }

    /// The period this slot belongs to.
    pub fn period(self) -> Period {
        match self {
            TimeSlot::Early | TimeSlot::LateMorning => Period::Morning,
            TimeSlot::Midday | TimeSlot::MidAfternoon => Period::Afternoon,
            TimeSlot::EarlyEvening | TimeSlot::LateEvening => Period::Evening,
        }
    }

    /// Slots belonging to a period.
    pub fn in_period(period: Period) -> impl Iterator<Item = TimeSlot> {
        Self::ALL.into_iter().filter(move |slot| slot.period() == period)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00 - {:02}:00", self.start_hour(), self.end_hour())
    }
}

impl FromStr for TimeSlot {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.id() == s.trim())
            .ok_or_else(|| BookingError::UnknownSlot(s.to_string()))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.id().to_string()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn two_slots_per_period() {
        for period in [Period::Morning, Period::Afternoon, Period::Evening] {
            assert_eq!(TimeSlot::in_period(period).count(), 2);
        }
    }

    #[test]
    fn slots_are_contiguous_two_hour_windows() {
        for pair in TimeSlot::ALL.windows(2) {
            if let [earlier, later] = pair {
                assert_eq!(earlier.end_hour(), later.start_hour());
            }
        }
    }

    #[test]
    fn parses_from_id() -> TestResult {
        assert_eq!("14-16".parse::<TimeSlot>()?, TimeSlot::MidAfternoon);
        assert!("07-09".parse::<TimeSlot>().is_err());

        Ok(())
    }

    #[test]
    fn serializes_as_id() -> TestResult {
        assert_eq!(serde_json::to_string(&TimeSlot::LateEvening)?, "\"18-20\"");
        assert_eq!(
            serde_json::from_str::<TimeSlot>("\"08-10\"")?,
            TimeSlot::Early
        );

        Ok(())
    }

    #[test]
    fn displays_hours() {
        assert_eq!(TimeSlot::Early.to_string(), "08:00 - 10:00");
    }
}
