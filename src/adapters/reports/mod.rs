//! Report adapters. Serialize domain reports for export.

pub mod csv_utils;

pub use csv_utils::monthly_report_to_csv;
