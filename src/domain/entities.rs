//! Domain entities. Pure data structures for the core business.
//!
//! No database types here; adapters map rows into these.

use crate::domain::errors::DomainError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A class group meeting on a weekly recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Raw pattern code as stored (e.g. `SAT_TUE_THU`). Parsed with `RecurrencePattern::parse`.
    pub pattern: String,
    /// Session start time, UTC.
    pub start_time: NaiveTime,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    /// Value encoded in the student's QR badge. Unique.
    pub qr_code: String,
    pub group_id: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    /// Attended another group's session instead of their own.
    Makeup,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Makeup => "makeup",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(AttendanceStatus::Present),
            "makeup" => Some(AttendanceStatus::Makeup),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }

    /// Present and makeup both satisfy an attendance expectation.
    pub fn counts_as_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Makeup)
    }
}

/// One attendance fact. At most one per (student, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    /// Group whose session was attended; differs from the student's own group for makeups.
    pub group_id: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Monthly fee payment. At most one per (student, year, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub student_id: i64,
    pub year: i32,
    pub month: u32,
    /// Amount in minor currency units.
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
}

/// One student's attendance tally for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentMonthSummary {
    pub student_id: i64,
    pub full_name: String,
    pub group_name: String,
    /// Session dates of the student's group in the month, up to the report date.
    pub expected_sessions: usize,
    pub present: usize,
    pub makeup: usize,
    pub absent: usize,
}

impl StudentMonthSummary {
    /// Expected sessions with no record at all (neither attendance nor absence yet).
    pub fn unrecorded(&self) -> usize {
        self.expected_sessions
            .saturating_sub(self.present + self.makeup + self.absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<StudentMonthSummary>,
}

/// Minutes after a session's scheduled end during which late attendance is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GracePeriod(u32);

impl GracePeriod {
    pub const MIN_MINUTES: u32 = 5;
    pub const MAX_MINUTES: u32 = 60;
    /// Value seeded into a fresh store.
    pub const DEFAULT_MINUTES: u32 = 15;

    pub fn new(minutes: u32) -> Result<Self, DomainError> {
        if (Self::MIN_MINUTES..=Self::MAX_MINUTES).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(DomainError::Validation(format!(
                "grace period must be between {} and {} minutes, got {}",
                Self::MIN_MINUTES,
                Self::MAX_MINUTES,
                minutes
            )))
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

impl Default for GracePeriod {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}

impl fmt::Display for GracePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_period_bounds() {
        assert!(GracePeriod::new(4).is_err());
        assert!(GracePeriod::new(61).is_err());
        assert_eq!(GracePeriod::new(5).unwrap().minutes(), 5);
        assert_eq!(GracePeriod::new(60).unwrap().minutes(), 60);
        assert_eq!(GracePeriod::default().minutes(), 15);
    }

    #[test]
    fn attendance_status_roundtrip_and_attended() {
        for s in [
            AttendanceStatus::Present,
            AttendanceStatus::Makeup,
            AttendanceStatus::Absent,
        ] {
            assert_eq!(AttendanceStatus::parse(s.as_str()), Some(s));
        }
        assert!(AttendanceStatus::Makeup.counts_as_attended());
        assert!(!AttendanceStatus::Absent.counts_as_attended());
        assert_eq!(AttendanceStatus::parse("late"), None);
    }
}
