//! CSV export for monthly attendance reports. Uses the `csv` crate for safe serialization.
//!
//! Semicolon-delimited so the file opens cleanly in spreadsheet tools that use comma decimals.

use crate::domain::MonthlyReport;

const HEADER: [&str; 8] = [
    "Student ID",
    "Name",
    "Group",
    "Expected",
    "Present",
    "Makeup",
    "Absent",
    "Unrecorded",
];

/// Convert a monthly report to CSV: one header row, then one row per student.
pub fn monthly_report_to_csv(report: &MonthlyReport) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;

    for row in &report.rows {
        // Names are free text; the csv crate quotes delimiters, newlines are flattened.
        let name = row.full_name.replace(['\n', '\r'], " ");
        let group = row.group_name.replace(['\n', '\r'], " ");
        wtr.write_record([
            row.student_id.to_string(),
            name,
            group,
            row.expected_sessions.to_string(),
            row.present.to_string(),
            row.makeup.to_string(),
            row.absent.to_string(),
            row.unrecorded().to_string(),
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudentMonthSummary;

    fn summary(name: &str) -> StudentMonthSummary {
        StudentMonthSummary {
            student_id: 1,
            full_name: name.to_string(),
            group_name: "Grade 9 A".to_string(),
            expected_sessions: 13,
            present: 10,
            makeup: 1,
            absent: 1,
        }
    }

    #[test]
    fn test_report_to_csv_basic() {
        let report = MonthlyReport {
            year: 2025,
            month: 3,
            rows: vec![summary("Mona Adel")],
        };
        let csv = monthly_report_to_csv(&report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Student ID;Name;Group"));
        assert_eq!(lines[1], "1;Mona Adel;Grade 9 A;13;10;1;1;1");
    }

    #[test]
    fn test_report_to_csv_special_chars() {
        let report = MonthlyReport {
            year: 2025,
            month: 3,
            rows: vec![summary("Mona; \"the\"\nstar")],
        };
        let csv = monthly_report_to_csv(&report).unwrap();
        // Header + one data row; the delimiter inside the name is quoted.
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"Mona; \"\"the\"\" star\""));
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let report = MonthlyReport {
            year: 2025,
            month: 3,
            rows: vec![],
        };
        let csv = monthly_report_to_csv(&report).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
