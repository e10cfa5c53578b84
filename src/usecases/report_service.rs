//! Monthly attendance reports.
//!
//! Expected sessions come from each group's recurrence pattern expanded over the month,
//! limited to dates up to the report date; tallies come from stored attendance records.

use crate::adapters::reports::monthly_report_to_csv;
use crate::domain::{
    AttendanceStatus, DomainError, Group, MonthlyReport, RecurrencePattern, StudentMonthSummary,
    session_dates,
};
use crate::ports::{AttendancePort, RosterPort};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub struct ReportService {
    roster: Arc<dyn RosterPort>,
    attendance: Arc<dyn AttendancePort>,
    reports_dir: PathBuf,
}

impl ReportService {
    pub fn new(
        roster: Arc<dyn RosterPort>,
        attendance: Arc<dyn AttendancePort>,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            roster,
            attendance,
            reports_dir,
        }
    }

    /// Per-student tallies for active students in `year`/`month`, counting expected
    /// sessions only up to `as_of`.
    pub async fn monthly_summary(
        &self,
        year: i32,
        month: u32,
        as_of: NaiveDate,
    ) -> Result<MonthlyReport, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "month must be 1-12, got {}",
                month
            )));
        }

        let mut groups: HashMap<i64, Option<Group>> = HashMap::new();
        let mut tallies: HashMap<i64, [usize; 3]> = HashMap::new();
        for record in self.attendance.attendance_for_month(year, month).await? {
            let slot = match record.status {
                AttendanceStatus::Present => 0,
                AttendanceStatus::Makeup => 1,
                AttendanceStatus::Absent => 2,
            };
            tallies.entry(record.student_id).or_default()[slot] += 1;
        }

        let mut rows = Vec::new();
        for student in self.roster.list_students().await? {
            if !student.active {
                continue;
            }
            if !groups.contains_key(&student.group_id) {
                let group = self.roster.group(student.group_id).await?;
                groups.insert(student.group_id, group);
            }
            let group = groups.get(&student.group_id).and_then(|g| g.as_ref());
            let expected_sessions = group
                .and_then(|g| RecurrencePattern::parse(&g.pattern))
                .map(|p| {
                    session_dates(year, month, p)
                        .into_iter()
                        .filter(|d| *d <= as_of)
                        .count()
                })
                .unwrap_or(0);
            let [present, makeup, absent] =
                tallies.get(&student.id).copied().unwrap_or_default();
            rows.push(StudentMonthSummary {
                student_id: student.id,
                full_name: student.full_name,
                group_name: group.map(|g| g.name.clone()).unwrap_or_default(),
                expected_sessions,
                present,
                makeup,
                absent,
            });
        }

        Ok(MonthlyReport { year, month, rows })
    }

    /// Write the report as CSV to `<reports_dir>/attendance_YYYY-MM.csv`, replacing any previous export.
    pub async fn export_csv(&self, report: &MonthlyReport) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::Report(format!("Failed to create reports dir: {}", e)))?;

        let csv = monthly_report_to_csv(report)
            .map_err(|e| DomainError::Report(format!("Failed to generate CSV: {}", e)))?;
        let path = self.reports_dir.join(format!(
            "attendance_{:04}-{:02}.csv",
            report.year, report.month
        ));
        fs::write(&path, csv)
            .await
            .map_err(|e| DomainError::Report(format!("Failed to write report: {}", e)))?;

        info!(path = %path.display(), rows = report.rows.len(), "report generated");
        Ok(path)
    }

    /// Write the report as pretty JSON next to the CSV (`attendance_YYYY-MM.json`).
    pub async fn export_json(&self, report: &MonthlyReport) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::Report(format!("Failed to create reports dir: {}", e)))?;

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| DomainError::Report(format!("Failed to serialize report: {}", e)))?;
        let path = self.reports_dir.join(format!(
            "attendance_{:04}-{:02}.json",
            report.year, report.month
        ));
        fs::write(&path, json)
            .await
            .map_err(|e| DomainError::Report(format!("Failed to write report: {}", e)))?;
        Ok(path)
    }
}
