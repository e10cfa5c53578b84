//! In-memory repository for tests.
//!
//! Implements every storage port over plain maps guarded by one tokio RwLock.
//! Failures can be injected per concern to exercise error paths in the use cases.

use crate::domain::{
    AttendanceRecord, AttendanceStatus, DomainError, GracePeriod, Group, Payment,
    RecurrencePattern, Student,
};
use crate::ports::{AttendancePort, PaymentPort, RosterPort, SettingsPort};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug)]
struct MemoryData {
    grace_minutes: u32,
    groups: BTreeMap<i64, Group>,
    students: BTreeMap<i64, Student>,
    attendance: BTreeMap<(i64, NaiveDate), AttendanceRecord>,
    payments: BTreeMap<(i64, i32, u32), Payment>,
    /// Students whose absence writes fail.
    failing_absence_writes: HashSet<i64>,
}

impl Default for MemoryData {
    fn default() -> Self {
        Self {
            grace_minutes: GracePeriod::DEFAULT_MINUTES,
            groups: BTreeMap::new(),
            students: BTreeMap::new(),
            attendance: BTreeMap::new(),
            payments: BTreeMap::new(),
            failing_absence_writes: HashSet::new(),
        }
    }
}

/// Map-backed repository.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    data: RwLock<MemoryData>,
    fail_settings: AtomicBool,
    fail_group_reads: AtomicBool,
    fail_student_reads: AtomicBool,
    fail_attendance_reads: AtomicBool,
    settings_reads: AtomicUsize,
    /// Simulated latency on grace-period reads.
    read_delay: Option<Duration>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository whose grace-period reads take `delay` to complete.
    pub fn with_read_delay(delay: Duration) -> Self {
        Self {
            read_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make grace-period reads and writes fail until reset.
    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// Make group lookups (`active_groups`, `group`) fail until reset.
    pub fn fail_group_reads(&self, fail: bool) {
        self.fail_group_reads.store(fail, Ordering::SeqCst);
    }

    /// Make student lookups fail until reset.
    pub fn fail_student_reads(&self, fail: bool) {
        self.fail_student_reads.store(fail, Ordering::SeqCst);
    }

    /// Make attendance reads fail until reset. Writes are unaffected.
    pub fn fail_attendance_reads(&self, fail: bool) {
        self.fail_attendance_reads.store(fail, Ordering::SeqCst);
    }

    /// Make absence writes for this student fail.
    pub async fn fail_absence_writes_for(&self, student_id: i64) {
        self.data
            .write()
            .await
            .failing_absence_writes
            .insert(student_id);
    }

    /// Number of grace-period reads served so far (successful or not).
    pub fn settings_reads(&self) -> usize {
        self.settings_reads.load(Ordering::SeqCst)
    }

    /// All stored attendance records with the given status.
    pub async fn records_with_status(&self, status: AttendanceStatus) -> Vec<AttendanceRecord> {
        self.data
            .read()
            .await
            .attendance
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    fn check_settings(&self) -> Result<(), DomainError> {
        check(&self.fail_settings, "settings")
    }

    fn check_groups(&self) -> Result<(), DomainError> {
        check(&self.fail_group_reads, "groups")
    }

    fn check_students(&self) -> Result<(), DomainError> {
        check(&self.fail_student_reads, "students")
    }

    fn check_attendance(&self) -> Result<(), DomainError> {
        check(&self.fail_attendance_reads, "attendance")
    }
}

fn check(flag: &AtomicBool, what: &str) -> Result<(), DomainError> {
    if flag.load(Ordering::SeqCst) {
        Err(DomainError::Persistence(format!("{} store unavailable", what)))
    } else {
        Ok(())
    }
}

#[async_trait::async_trait]
impl SettingsPort for MemoryRepo {
    async fn grace_period_minutes(&self) -> Result<u32, DomainError> {
        self.settings_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_settings()?;
        Ok(self.data.read().await.grace_minutes)
    }

    async fn set_grace_period_minutes(&self, minutes: u32) -> Result<(), DomainError> {
        self.check_settings()?;
        self.data.write().await.grace_minutes = minutes;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterPort for MemoryRepo {
    async fn active_groups(&self) -> Result<Vec<Group>, DomainError> {
        self.check_groups()?;
        Ok(self
            .data
            .read()
            .await
            .groups
            .values()
            .filter(|g| g.active)
            .cloned()
            .collect())
    }

    async fn group(&self, group_id: i64) -> Result<Option<Group>, DomainError> {
        self.check_groups()?;
        Ok(self.data.read().await.groups.get(&group_id).cloned())
    }

    async fn add_group(
        &self,
        name: &str,
        pattern: RecurrencePattern,
        start_time: NaiveTime,
    ) -> Result<Group, DomainError> {
        let mut data = self.data.write().await;
        let id = data.groups.keys().next_back().copied().unwrap_or(0) + 1;
        let group = Group {
            id,
            name: name.to_string(),
            pattern: pattern.code().to_string(),
            start_time,
            active: true,
        };
        data.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn set_group_active(&self, group_id: i64, active: bool) -> Result<bool, DomainError> {
        let mut data = self.data.write().await;
        match data.groups.get_mut(&group_id) {
            Some(g) => {
                g.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn students_in_group(&self, group_id: i64) -> Result<Vec<Student>, DomainError> {
        self.check_students()?;
        Ok(self
            .data
            .read()
            .await
            .students
            .values()
            .filter(|s| s.active && s.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn student(&self, student_id: i64) -> Result<Option<Student>, DomainError> {
        self.check_students()?;
        Ok(self.data.read().await.students.get(&student_id).cloned())
    }

    async fn student_by_qr(&self, qr_code: &str) -> Result<Option<Student>, DomainError> {
        self.check_students()?;
        Ok(self
            .data
            .read()
            .await
            .students
            .values()
            .find(|s| s.qr_code == qr_code)
            .cloned())
    }

    async fn add_student(
        &self,
        full_name: &str,
        qr_code: &str,
        group_id: i64,
    ) -> Result<Student, DomainError> {
        let mut data = self.data.write().await;
        if data.students.values().any(|s| s.qr_code == qr_code) {
            return Err(DomainError::Validation(format!(
                "QR code '{}' is already assigned",
                qr_code
            )));
        }
        let id = data.students.keys().next_back().copied().unwrap_or(0) + 1;
        let student = Student {
            id,
            full_name: full_name.to_string(),
            qr_code: qr_code.to_string(),
            group_id,
            active: true,
        };
        data.students.insert(id, student.clone());
        Ok(student)
    }

    async fn set_student_active(&self, student_id: i64, active: bool) -> Result<bool, DomainError> {
        let mut data = self.data.write().await;
        match data.students.get_mut(&student_id) {
            Some(s) => {
                s.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_students(&self) -> Result<Vec<Student>, DomainError> {
        self.check_students()?;
        Ok(self.data.read().await.students.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl AttendancePort for MemoryRepo {
    async fn attended_student_ids(&self, date: NaiveDate) -> Result<HashSet<i64>, DomainError> {
        self.check_attendance()?;
        Ok(self
            .data
            .read()
            .await
            .attendance
            .values()
            .filter(|r| r.date == date && r.status.counts_as_attended())
            .map(|r| r.student_id)
            .collect())
    }

    async fn attendance_status(
        &self,
        student_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceStatus>, DomainError> {
        self.check_attendance()?;
        Ok(self
            .data
            .read()
            .await
            .attendance
            .get(&(student_id, date))
            .map(|r| r.status))
    }

    async fn record_attendance(&self, record: &AttendanceRecord) -> Result<bool, DomainError> {
        let mut data = self.data.write().await;
        let key = (record.student_id, record.date);
        if data.attendance.contains_key(&key) {
            return Ok(false);
        }
        data.attendance.insert(key, record.clone());
        Ok(true)
    }

    async fn mark_absent(
        &self,
        student_id: i64,
        group_id: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        if self
            .data
            .read()
            .await
            .failing_absence_writes
            .contains(&student_id)
        {
            return Err(DomainError::Persistence(format!(
                "write failed for student {}",
                student_id
            )));
        }
        self.record_attendance(&AttendanceRecord {
            student_id,
            date,
            status: AttendanceStatus::Absent,
            group_id,
            recorded_at: at,
        })
        .await
    }

    async fn attendance_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceRecord>, DomainError> {
        self.check_attendance()?;
        Ok(self
            .data
            .read()
            .await
            .attendance
            .values()
            .filter(|r| r.date.year() == year && r.date.month() == month)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PaymentPort for MemoryRepo {
    async fn record_payment(&self, payment: &Payment) -> Result<bool, DomainError> {
        let mut data = self.data.write().await;
        let key = (payment.student_id, payment.year, payment.month);
        if data.payments.contains_key(&key) {
            return Ok(false);
        }
        data.payments.insert(key, payment.clone());
        Ok(true)
    }

    async fn payments_for_month(&self, year: i32, month: u32) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .data
            .read()
            .await
            .payments
            .values()
            .filter(|p| p.year == year && p.month == month)
            .cloned()
            .collect())
    }
}
