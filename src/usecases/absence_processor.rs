//! Absence processor: marks students absent once today's session window has closed.
//!
//! For every active group meeting today (per its recurrence pattern), a session is
//! due once `start + session duration + grace period <= now`. Every active student
//! of a due group without a present/makeup record for today gets an absence record.
//! The store's (student, date) uniqueness guard makes repeated runs idempotent.

use crate::domain::{
    DomainError, GracePeriod, Group, RecurrencePattern, SessionWindow, is_session_date,
};
use crate::ports::{AttendancePort, RosterPort};
use crate::usecases::grace_period::GracePeriodStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Outcome of one processor run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    /// Today's sessions whose window had closed.
    pub scanned_sessions: usize,
    /// Absence records newly written by this run.
    pub marked_absent: usize,
    /// Absence writes that failed and were skipped.
    pub failed_writes: usize,
    /// True when another run held the gate and this one did nothing.
    pub skipped: bool,
}

impl ProcessReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Releases the in-flight flag on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AbsenceProcessor {
    grace: Arc<GracePeriodStore>,
    roster: Arc<dyn RosterPort>,
    attendance: Arc<dyn AttendancePort>,
    session_duration: Duration,
    in_flight: AtomicBool,
}

impl AbsenceProcessor {
    pub fn new(
        grace: Arc<GracePeriodStore>,
        roster: Arc<dyn RosterPort>,
        attendance: Arc<dyn AttendancePort>,
        session_duration: Duration,
    ) -> Self {
        Self {
            grace,
            roster,
            attendance,
            session_duration,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(&self.in_flight))
    }

    /// Run one scan at `now`.
    ///
    /// Returns `ProcessReport::skipped()` if a run is already in flight. Fails without
    /// writing anything when the grace period, groups, today's attendance or the students
    /// of a due group cannot be read. Individual absence write failures are logged and
    /// counted, not propagated.
    pub async fn process(&self, now: DateTime<Utc>) -> Result<ProcessReport, DomainError> {
        let Some(_guard) = self.try_begin() else {
            debug!("absence run already in flight; skipping");
            return Ok(ProcessReport::skipped());
        };

        let grace = self.grace.get().await?;
        let today = now.date_naive();
        let groups = self.roster.active_groups().await?;

        let due: Vec<SessionWindow> = groups
            .iter()
            .filter_map(|g| self.session_today(g, today, grace))
            .filter(|w| w.has_closed(now))
            .collect();

        let mut report = ProcessReport::default();
        if due.is_empty() {
            debug!(date = %today, groups = groups.len(), "no closed sessions to scan");
            return Ok(report);
        }

        let attended = self.attendance.attended_student_ids(today).await?;

        // All reads happen before the first write: a failed roster read aborts the run clean.
        let mut batches = Vec::with_capacity(due.len());
        for window in due {
            let students = self.roster.students_in_group(window.group_id).await?;
            batches.push((window, students));
        }

        for (window, students) in batches {
            report.scanned_sessions += 1;
            for student in students.iter().filter(|s| !attended.contains(&s.id)) {
                match self
                    .attendance
                    .mark_absent(student.id, window.group_id, window.date, now)
                    .await
                {
                    Ok(true) => {
                        report.marked_absent += 1;
                        debug!(student_id = student.id, group_id = window.group_id, date = %window.date, "marked absent");
                    }
                    Ok(false) => {}
                    Err(e) => {
                        report.failed_writes += 1;
                        warn!(student_id = student.id, date = %window.date, error = %e, "absence write failed");
                    }
                }
            }
        }

        info!(
            date = %today,
            grace_minutes = grace.minutes(),
            scanned = report.scanned_sessions,
            marked = report.marked_absent,
            failed = report.failed_writes,
            "absence run complete"
        );
        Ok(report)
    }

    /// Today's session window for the group, if its pattern meets today.
    fn session_today(
        &self,
        group: &Group,
        today: NaiveDate,
        grace: GracePeriod,
    ) -> Option<SessionWindow> {
        let Some(pattern) = RecurrencePattern::parse(&group.pattern) else {
            warn!(group_id = group.id, pattern = %group.pattern, "unknown recurrence pattern");
            return None;
        };
        is_session_date(pattern, today).then(|| {
            SessionWindow::new(
                group.id,
                today,
                group.start_time,
                self.session_duration,
                grace,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::{AttendanceRecord, AttendanceStatus};
    use crate::ports::{AttendancePort, RosterPort, SettingsPort};
    use chrono::NaiveTime;

    /// 2025-03-04 is a Tuesday.
    fn at(hh: u32, mm: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
            .and_utc()
    }

    struct Fixture {
        repo: Arc<MemoryRepo>,
        processor: Arc<AbsenceProcessor>,
        group_id: i64,
        students: Vec<i64>,
    }

    async fn fixture_with(repo: MemoryRepo) -> Fixture {
        let repo = Arc::new(repo);
        // Tue/Thu/Sat group at 16:00; 120 min session + 15 min grace closes at 18:15.
        let group = repo
            .add_group(
                "Grade 9 A",
                RecurrencePattern::SatTueThu,
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        // Mon/Thu group: no session on a Tuesday.
        let other = repo
            .add_group(
                "Grade 8 B",
                RecurrencePattern::MonThu,
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        let mut students = Vec::new();
        for (i, name) in ["Mona", "Omar", "Laila"].iter().enumerate() {
            let s = repo
                .add_student(name, &format!("QR-{}", i), group.id)
                .await
                .unwrap();
            students.push(s.id);
        }
        repo.add_student("Youssef", "QR-other", other.id)
            .await
            .unwrap();

        let grace = Arc::new(GracePeriodStore::new(repo.clone()));
        let processor = Arc::new(AbsenceProcessor::new(
            grace,
            repo.clone(),
            repo.clone(),
            Duration::minutes(120),
        ));
        Fixture {
            repo,
            processor,
            group_id: group.id,
            students,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MemoryRepo::new()).await
    }

    #[tokio::test]
    async fn nothing_marked_before_window_closes() {
        let f = fixture().await;
        let report = f.processor.process(at(18, 14)).await.unwrap();
        assert_eq!(report, ProcessReport::default());
        assert!(
            f.repo
                .records_with_status(AttendanceStatus::Absent)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn marks_only_students_without_attendance() {
        let f = fixture().await;
        f.repo
            .record_attendance(&AttendanceRecord {
                student_id: f.students[0],
                date: at(0, 0).date_naive(),
                status: AttendanceStatus::Present,
                group_id: f.group_id,
                recorded_at: at(16, 5),
            })
            .await
            .unwrap();
        // Makeup in another group still counts as attended.
        f.repo
            .record_attendance(&AttendanceRecord {
                student_id: f.students[1],
                date: at(0, 0).date_naive(),
                status: AttendanceStatus::Makeup,
                group_id: 99,
                recorded_at: at(11, 0),
            })
            .await
            .unwrap();

        let report = f.processor.process(at(18, 15)).await.unwrap();
        assert_eq!(report.scanned_sessions, 1);
        assert_eq!(report.marked_absent, 1);

        let absent = f.repo.records_with_status(AttendanceStatus::Absent).await;
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].student_id, f.students[2]);
        assert_eq!(absent[0].group_id, f.group_id);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let f = fixture().await;
        let first = f.processor.process(at(19, 0)).await.unwrap();
        assert_eq!(first.marked_absent, 3);
        let second = f.processor.process(at(19, 0)).await.unwrap();
        assert_eq!(second.scanned_sessions, 1);
        assert_eq!(second.marked_absent, 0);
        assert_eq!(
            f.repo.records_with_status(AttendanceStatus::Absent).await.len(),
            3
        );
    }

    #[tokio::test]
    async fn grace_period_extends_window() {
        let f = fixture().await;
        f.repo.set_grace_period_minutes(60).await.unwrap();
        assert_eq!(f.processor.process(at(18, 30)).await.unwrap().marked_absent, 0);
        assert_eq!(f.processor.process(at(19, 0)).await.unwrap().marked_absent, 3);
    }

    #[tokio::test]
    async fn grace_read_failure_aborts_without_writes() {
        let f = fixture().await;
        f.repo.fail_settings(true);
        let result = f.processor.process(at(20, 0)).await;
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(
            f.repo
                .records_with_status(AttendanceStatus::Absent)
                .await
                .is_empty()
        );

        // Gate released after the failure.
        f.repo.fail_settings(false);
        assert_eq!(f.processor.process(at(20, 0)).await.unwrap().marked_absent, 3);
    }

    async fn assert_read_failure_aborts(f: &Fixture) {
        let result = f.processor.process(at(20, 0)).await;
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(
            f.repo
                .records_with_status(AttendanceStatus::Absent)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn group_read_failure_aborts_without_writes() {
        let f = fixture().await;
        f.repo.fail_group_reads(true);
        assert_read_failure_aborts(&f).await;

        f.repo.fail_group_reads(false);
        assert_eq!(f.processor.process(at(20, 0)).await.unwrap().marked_absent, 3);
    }

    #[tokio::test]
    async fn attendance_read_failure_aborts_without_writes() {
        let f = fixture().await;
        f.repo.fail_attendance_reads(true);
        assert_read_failure_aborts(&f).await;

        f.repo.fail_attendance_reads(false);
        assert_eq!(f.processor.process(at(20, 0)).await.unwrap().marked_absent, 3);
    }

    #[tokio::test]
    async fn student_read_failure_aborts_without_writes() {
        let f = fixture().await;
        f.repo.fail_student_reads(true);
        assert_read_failure_aborts(&f).await;

        f.repo.fail_student_reads(false);
        let report = f.processor.process(at(20, 0)).await.unwrap();
        assert_eq!(report.scanned_sessions, 1);
        assert_eq!(report.marked_absent, 3);
    }

    #[tokio::test]
    async fn write_failure_does_not_abort_batch() {
        let f = fixture().await;
        f.repo.fail_absence_writes_for(f.students[1]).await;
        let report = f.processor.process(at(20, 0)).await.unwrap();
        assert_eq!(report.marked_absent, 2);
        assert_eq!(report.failed_writes, 1);
    }

    #[tokio::test]
    async fn inactive_students_and_other_days_are_ignored() {
        let f = fixture().await;
        f.repo.set_student_active(f.students[0], false).await.unwrap();
        assert_eq!(f.processor.process(at(20, 0)).await.unwrap().marked_absent, 2);

        // Wednesday: neither group meets.
        let wednesday = at(20, 0) + Duration::days(1);
        let report = f.processor.process(wednesday).await.unwrap();
        assert_eq!(report.scanned_sessions, 0);
    }

    #[tokio::test]
    async fn held_gate_skips_run() {
        let f = fixture().await;
        let guard = f.processor.try_begin().unwrap();
        let report = f.processor.process(at(20, 0)).await.unwrap();
        assert_eq!(report, ProcessReport::skipped());
        drop(guard);
        assert_eq!(f.processor.process(at(20, 0)).await.unwrap().marked_absent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_run_returns_noop() {
        let f = fixture_with(MemoryRepo::with_read_delay(std::time::Duration::from_secs(1))).await;
        let p1 = Arc::clone(&f.processor);
        let p2 = Arc::clone(&f.processor);
        let (a, b) = tokio::join!(p1.process(at(20, 0)), p2.process(at(20, 0)));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.skipped ^ b.skipped);
        assert_eq!(a.marked_absent + b.marked_absent, 3);
        assert_eq!(f.repo.settings_reads(), 1);
    }
}
