//! Japan Standard Time calendar helpers
//!
//! Providers publish their schedules in JST. The offset is fixed at +09:00
//! and never observes daylight saving, so a plain [`FixedOffset`] is enough.
//!
//! Two inference rules live here because scheduling correctness depends on them:
//!
//! - [`resolve_broadcast_time`]: broadcast grids write hours past midnight as
//!   24, 25, 26… on the previous day's programming block.
//! - [`infer_year`]: on-demand listings only carry month/day.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone};
use std::fmt;

const JST_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Returns the permanent UTC+9 offset
pub fn offset() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("+09:00 is a valid offset")
}

/// A civil day in JST
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Build a date from its civil components
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::TimeResolution(format!("invalid date {year}-{month}-{day}")))
    }

    /// The JST day containing `now`
    pub fn today(now: DateTime<FixedOffset>) -> Self {
        Self(now.with_timezone(&offset()).date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// The following day
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    /// 00:00 JST of this day
    pub fn start_of_day(&self) -> Result<DateTime<FixedOffset>> {
        let naive = self
            .0
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::TimeResolution(format!("no midnight for {self}")))?;
        offset()
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| Error::TimeResolution(format!("ambiguous midnight for {self}")))
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Resolve a broadcast-day time to a JST timestamp
///
/// `date` is the nominal broadcast day, never pre-rolled. Hours of 24 and
/// above roll the date forward: `(D, 25, 30)` is 01:30 on `D + 1`.
pub fn resolve_broadcast_time(
    date: CalendarDate,
    hour: u32,
    minute: u32,
) -> Result<DateTime<FixedOffset>> {
    let midnight = date.start_of_day()?;
    let offset = Duration::try_hours(i64::from(hour))
        .and_then(|h| Duration::try_minutes(i64::from(minute)).map(|m| h + m))
        .ok_or_else(|| Error::TimeResolution(format!("{hour}:{minute} out of range")))?;

    midnight.checked_add_signed(offset).ok_or_else(|| {
        Error::TimeResolution(format!("{date} {hour}:{minute:02} overflows the calendar"))
    })
}

/// Infer the year of a month/day-only listing date
///
/// The candidate built with `now`'s year is kept when it lies strictly
/// within the past 365 days; otherwise the entry is taken from the previous
/// year. Listings older than one year are assumed not to exist.
///
/// A month/day that does not exist in `now`'s year (02-29 after a leap
/// year) is taken from the previous year.
pub fn infer_year(now: DateTime<FixedOffset>, month: u32, day: u32) -> Result<CalendarDate> {
    let now = now.with_timezone(&offset());
    let year = now.year();

    if let Ok(same_year) = CalendarDate::new(year, month, day) {
        let diff = now.signed_duration_since(same_year.start_of_day()?);
        if diff > Duration::zero() && diff < Duration::days(365) {
            return Ok(same_year);
        }
    }

    CalendarDate::new(year - 1, month, day)
}
