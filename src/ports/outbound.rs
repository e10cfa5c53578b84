//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{AttendanceRecord, AttendanceStatus, DomainError, Group, Payment, RecurrencePattern, Student};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashSet;

/// Durable admin settings.
#[async_trait::async_trait]
pub trait SettingsPort: Send + Sync {
    /// Stored grace period in minutes. An unavailable store is an error, never a default.
    async fn grace_period_minutes(&self) -> Result<u32, DomainError>;

    /// Overwrite the stored grace period. Last write wins.
    async fn set_grace_period_minutes(&self, minutes: u32) -> Result<(), DomainError>;
}

/// Groups and students.
#[async_trait::async_trait]
pub trait RosterPort: Send + Sync {
    async fn active_groups(&self) -> Result<Vec<Group>, DomainError>;

    async fn group(&self, group_id: i64) -> Result<Option<Group>, DomainError>;

    async fn add_group(
        &self,
        name: &str,
        pattern: RecurrencePattern,
        start_time: NaiveTime,
    ) -> Result<Group, DomainError>;

    /// Returns false when no such group exists.
    async fn set_group_active(&self, group_id: i64, active: bool) -> Result<bool, DomainError>;

    /// Active students enrolled in the group.
    async fn students_in_group(&self, group_id: i64) -> Result<Vec<Student>, DomainError>;

    async fn student(&self, student_id: i64) -> Result<Option<Student>, DomainError>;

    async fn student_by_qr(&self, qr_code: &str) -> Result<Option<Student>, DomainError>;

    /// Fails with `Validation` when the QR code is already taken.
    async fn add_student(
        &self,
        full_name: &str,
        qr_code: &str,
        group_id: i64,
    ) -> Result<Student, DomainError>;

    /// Returns false when no such student exists.
    async fn set_student_active(&self, student_id: i64, active: bool) -> Result<bool, DomainError>;

    /// All students, active or not, ordered by id.
    async fn list_students(&self) -> Result<Vec<Student>, DomainError>;
}

/// Attendance facts. The store guards uniqueness on (student, date).
#[async_trait::async_trait]
pub trait AttendancePort: Send + Sync {
    /// Students with a present or makeup record on `date`.
    async fn attended_student_ids(&self, date: NaiveDate) -> Result<HashSet<i64>, DomainError>;

    /// Status of the student's record on `date`, if any.
    async fn attendance_status(
        &self,
        student_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceStatus>, DomainError>;

    /// Insert the record unless one already exists for (student, date). Returns true if inserted.
    async fn record_attendance(&self, record: &AttendanceRecord) -> Result<bool, DomainError>;

    /// Insert an absence unless any record exists for (student, date). Returns true if inserted.
    async fn mark_absent(
        &self,
        student_id: i64,
        group_id: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    async fn attendance_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceRecord>, DomainError>;
}

/// Monthly fee payments.
#[async_trait::async_trait]
pub trait PaymentPort: Send + Sync {
    /// Insert unless the student already paid for that month. Returns true if inserted.
    async fn record_payment(&self, payment: &Payment) -> Result<bool, DomainError>;

    async fn payments_for_month(&self, year: i32, month: u32) -> Result<Vec<Payment>, DomainError>;
}

/// Source of "now". Injected so schedule-dependent logic can be tested deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
