//! Time Engine - day bucketing for the calorie tally
//!
//! A calorie "day" starts at 03:00 local time instead of midnight, so late-night
//! snacks still count toward the evening they belong to. Everything that needs
//! to know "which day is it" goes through a [`Clock`] and a [`DayKey`].

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

/// Hour of the local day at which a new calorie day begins
pub const DAY_BOUNDARY_HOUR: i64 = 3;

/// Error type for time operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeError {
    /// The string is not a known IANA time zone
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    /// The string is not a `{year}-{dayOfYear}` key
    #[error("invalid day key: {0}")]
    InvalidDayKey(String),
}

/// Identifier of a custom calendar day that begins at 03:00.
///
/// Serialized as `"{year}-{dayOfYear}"` with the day of year zero-padded to
/// three digits, so the string order of keys matches their chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// The day key that is current at the given local wall time
    pub fn at(local: NaiveDateTime) -> Self {
        let shifted = local - Duration::hours(DAY_BOUNDARY_HOUR);
        DayKey(shifted.date())
    }

    /// Build a key from a year and a 1-based day of year
    pub fn from_year_ordinal(year: i32, ordinal: u32) -> Option<Self> {
        NaiveDate::from_yo_opt(year, ordinal).map(DayKey)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn ordinal(&self) -> u32 {
        self.0.ordinal()
    }

    /// The calendar date this day is named after
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The key of the day before this one
    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(DayKey)
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        DayKey(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.year(), self.ordinal())
    }
}

impl FromStr for DayKey {
    type Err = TimeError;

    /// Accepts both the padded form and older unpadded keys such as `"2025-9"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeError::InvalidDayKey(s.to_string());
        let (year, ordinal) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let ordinal: u32 = ordinal.parse().map_err(|_| invalid())?;
        DayKey::from_year_ordinal(year, ordinal).ok_or_else(invalid)
    }
}

/// The next 03:00 wall-clock instant strictly after `local`
pub fn next_reset_after(local: NaiveDateTime) -> NaiveDateTime {
    let today_reset = local.date().and_time(NaiveTime::MIN) + Duration::hours(DAY_BOUNDARY_HOUR);
    if today_reset > local {
        today_reset
    } else {
        today_reset + Duration::days(1)
    }
}

/// Source of the current local wall time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    /// Day key at the current instant
    fn today(&self) -> DayKey {
        DayKey::at(self.now())
    }
}

/// Wall time of the host's configured local zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Wall time in an explicitly chosen IANA zone
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock(pub Tz);

impl Clock for ZonedClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.0).naive_local()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Parse a timezone string into a Tz
pub fn parse_timezone(tz_str: &str) -> Result<Tz, TimeError> {
    tz_str
        .parse::<Tz>()
        .map_err(|_| TimeError::InvalidTimezone(tz_str.to_string()))
}
