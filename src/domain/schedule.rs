//! Weekly recurrence patterns and their expansion into concrete session dates.
//!
//! Weekday numbering follows the calendar convention: 0 = Sunday .. 6 = Saturday.
//! All dates are UTC calendar dates.

use crate::domain::entities::GracePeriod;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named set of weekdays on which a group meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrencePattern {
    SatTueThu,
    SunMonWed,
    SatMonWed,
    SunTueThu,
    SunWed,
    MonThu,
}

impl RecurrencePattern {
    pub const ALL: [RecurrencePattern; 6] = [
        RecurrencePattern::SatTueThu,
        RecurrencePattern::SunMonWed,
        RecurrencePattern::SatMonWed,
        RecurrencePattern::SunTueThu,
        RecurrencePattern::SunWed,
        RecurrencePattern::MonThu,
    ];

    /// Weekday numbers (Sunday = 0) this pattern meets on.
    pub fn weekdays(self) -> &'static [u32] {
        match self {
            RecurrencePattern::SatTueThu => &[6, 2, 4],
            RecurrencePattern::SunMonWed => &[0, 1, 3],
            RecurrencePattern::SatMonWed => &[6, 1, 3],
            RecurrencePattern::SunTueThu => &[0, 2, 4],
            RecurrencePattern::SunWed => &[0, 3],
            RecurrencePattern::MonThu => &[1, 4],
        }
    }

    /// Stable code used in storage and at the console.
    pub fn code(self) -> &'static str {
        match self {
            RecurrencePattern::SatTueThu => "SAT_TUE_THU",
            RecurrencePattern::SunMonWed => "SUN_MON_WED",
            RecurrencePattern::SatMonWed => "SAT_MON_WED",
            RecurrencePattern::SunTueThu => "SUN_TUE_THU",
            RecurrencePattern::SunWed => "SUN_WED",
            RecurrencePattern::MonThu => "MON_THU",
        }
    }

    /// Parse a stored or user-entered code. Case-insensitive; unknown codes yield `None`.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(code))
    }

    pub fn meets_on(self, date: NaiveDate) -> bool {
        self.weekdays()
            .contains(&date.weekday().num_days_from_sunday())
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// All dates in `year`/`month` (1-based month) that fall on one of the pattern's weekdays, ascending.
///
/// An out-of-range month yields an empty list.
pub fn session_dates(year: i32, month: u32, pattern: RecurrencePattern) -> Vec<NaiveDate> {
    let Some(mut day) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let mut dates = Vec::with_capacity(15);
    while day.month() == month {
        if pattern.meets_on(day) {
            dates.push(day);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    dates
}

/// Same as [`session_dates`] for a raw pattern code; unknown codes yield an empty list.
pub fn session_dates_for_code(year: i32, month: u32, code: &str) -> Vec<NaiveDate> {
    RecurrencePattern::parse(code)
        .map(|p| session_dates(year, month, p))
        .unwrap_or_default()
}

/// True when `date` is one of the pattern's generated dates for its own month.
pub fn is_session_date(pattern: RecurrencePattern, date: NaiveDate) -> bool {
    session_dates(date.year(), date.month(), pattern).contains(&date)
}

/// One concrete session of a group and the instant after which it no longer accepts attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub group_id: i64,
    pub date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl SessionWindow {
    /// `closes_at = date + start_time + duration + grace`.
    pub fn new(
        group_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
        duration: Duration,
        grace: GracePeriod,
    ) -> Self {
        let starts_at = date.and_time(start_time).and_utc();
        let closes_at = starts_at + duration + grace.as_duration();
        Self {
            group_id,
            date,
            starts_at,
            closes_at,
        }
    }

    pub fn has_closed(&self, now: DateTime<Utc>) -> bool {
        self.closes_at <= now
    }
}
