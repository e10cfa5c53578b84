//! Infrastructure adapters. Implement outbound ports.
//!
//! SQLite and in-memory storage, clocks, CSV reports, terminal UI. Map errors to DomainError.

pub mod clock;
pub mod persistence;
pub mod reports;
pub mod ui;
