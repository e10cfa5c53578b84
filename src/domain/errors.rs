//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected at the boundary (e.g. grace period outside 5..=60). No state changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backing store unavailable or returned a malformed row.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Check-in refused: no session today for the student's group, or the window has closed.
    #[error("Check-in rejected: {0}")]
    CheckInRejected(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Console error: {0}")]
    Console(String),
}

impl DomainError {
    pub fn persistence(e: impl std::fmt::Display) -> Self {
        Self::Persistence(e.to_string())
    }
}
