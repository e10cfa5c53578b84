//! Core domain layer. No external I/O dependencies.
//!
//! Entities, schedule arithmetic and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod schedule;

pub use entities::{
    AttendanceRecord, AttendanceStatus, GracePeriod, Group, MonthlyReport, Payment, Student,
    StudentMonthSummary,
};
pub use errors::DomainError;
pub use schedule::{
    RecurrencePattern, SessionWindow, is_session_date, session_dates, session_dates_for_code,
};
