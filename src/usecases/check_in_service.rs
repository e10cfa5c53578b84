//! QR check-in. Resolves a badge to a student and records attendance for today's session.
//!
//! A check-in is accepted only on a session date of an active group, from
//! [`CHECK_IN_OPENS_BEFORE_MINUTES`] before the start until the session window closes
//! (start + duration + grace). After that the absence processor owns the day.

use crate::domain::{
    AttendanceRecord, AttendanceStatus, DomainError, Group, RecurrencePattern, SessionWindow,
    Student, is_session_date,
};
use crate::ports::{AttendancePort, RosterPort};
use crate::usecases::grace_period::GracePeriodStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// How early before the session start a badge scan is accepted.
pub const CHECK_IN_OPENS_BEFORE_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    Recorded {
        student: Student,
        status: AttendanceStatus,
    },
    /// The student already has a record for today; nothing written. `status` is the existing one.
    AlreadyRecorded {
        student: Student,
        status: AttendanceStatus,
    },
}

pub struct CheckInService {
    roster: Arc<dyn RosterPort>,
    attendance: Arc<dyn AttendancePort>,
    grace: Arc<GracePeriodStore>,
    session_duration: Duration,
}

impl CheckInService {
    pub fn new(
        roster: Arc<dyn RosterPort>,
        attendance: Arc<dyn AttendancePort>,
        grace: Arc<GracePeriodStore>,
        session_duration: Duration,
    ) -> Self {
        Self {
            roster,
            attendance,
            grace,
            session_duration,
        }
    }

    /// Check a student into their own group's session.
    pub async fn check_in(
        &self,
        qr_code: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, DomainError> {
        let student = self.active_student(qr_code).await?;
        let group = self.active_group(student.group_id).await?;
        self.record(student, &group, AttendanceStatus::Present, now)
            .await
    }

    /// Check a student into another group's session as a makeup.
    pub async fn check_in_makeup(
        &self,
        qr_code: &str,
        host_group_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, DomainError> {
        let student = self.active_student(qr_code).await?;
        if student.group_id == host_group_id {
            return self.check_in(qr_code, now).await;
        }
        let host = self.active_group(host_group_id).await?;
        self.record(student, &host, AttendanceStatus::Makeup, now)
            .await
    }

    async fn active_student(&self, qr_code: &str) -> Result<Student, DomainError> {
        let qr_code = qr_code.trim();
        let student = self
            .roster
            .student_by_qr(qr_code)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("no student with QR code '{}'", qr_code)))?;
        if !student.active {
            return Err(DomainError::CheckInRejected(format!(
                "student '{}' is inactive",
                student.full_name
            )));
        }
        Ok(student)
    }

    async fn active_group(&self, group_id: i64) -> Result<Group, DomainError> {
        let group = self
            .roster
            .group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("group {}", group_id)))?;
        if !group.active {
            return Err(DomainError::CheckInRejected(format!(
                "group '{}' is inactive",
                group.name
            )));
        }
        Ok(group)
    }

    async fn record(
        &self,
        student: Student,
        group: &Group,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, DomainError> {
        let pattern = RecurrencePattern::parse(&group.pattern).ok_or_else(|| {
            DomainError::CheckInRejected(format!(
                "group '{}' has an unknown schedule '{}'",
                group.name, group.pattern
            ))
        })?;
        let today = now.date_naive();
        if !is_session_date(pattern, today) {
            return Err(DomainError::CheckInRejected(format!(
                "group '{}' has no session on {}",
                group.name, today
            )));
        }

        let grace = self.grace.get().await?;
        let window = SessionWindow::new(
            group.id,
            today,
            group.start_time,
            self.session_duration,
            grace,
        );
        let opens_at = window.starts_at - Duration::minutes(CHECK_IN_OPENS_BEFORE_MINUTES);
        if now < opens_at {
            return Err(DomainError::CheckInRejected(format!(
                "check-in for '{}' opens at {}",
                group.name,
                opens_at.format("%H:%M UTC")
            )));
        }
        if window.has_closed(now) {
            return Err(DomainError::CheckInRejected(format!(
                "session of '{}' closed at {}",
                group.name,
                window.closes_at.format("%H:%M UTC")
            )));
        }

        let inserted = self
            .attendance
            .record_attendance(&AttendanceRecord {
                student_id: student.id,
                date: today,
                status,
                group_id: group.id,
                recorded_at: now,
            })
            .await?;
        if !inserted {
            let existing = self
                .attendance
                .attendance_status(student.id, today)
                .await?
                .unwrap_or(status);
            return Ok(CheckInOutcome::AlreadyRecorded {
                student,
                status: existing,
            });
        }
        info!(
            student_id = student.id,
            group_id = group.id,
            status = status.as_str(),
            "checked in"
        );
        Ok(CheckInOutcome::Recorded { student, status })
    }
}
