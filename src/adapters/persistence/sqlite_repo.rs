//! SQLite-backed repository via libsql. Implements every storage port.
//!
//! One database file (data/school.db). Uniqueness guards live in the schema:
//! attendance is keyed by (student_id, date), payments by (student_id, year, month),
//! so duplicate writes become `ON CONFLICT DO NOTHING` no-ops.
//! Dates are stored as `YYYY-MM-DD`, times as `HH:MM`, instants as unix seconds.

use crate::domain::{
    AttendanceRecord, AttendanceStatus, DomainError, GracePeriod, Group, Payment,
    RecurrencePattern, Student,
};
use crate::ports::{AttendancePort, PaymentPort, RosterPort, SettingsPort};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use libsql::{params, Connection, Database, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    pattern TEXT NOT NULL,
    start_time TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
)"#;

const STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    qr_code TEXT NOT NULL UNIQUE,
    group_id INTEGER NOT NULL REFERENCES groups (id),
    active INTEGER NOT NULL DEFAULT 1
)"#;

const ATTENDANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
    student_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    recorded_at INTEGER NOT NULL,
    PRIMARY KEY (student_id, date)
)"#;
const ATTENDANCE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance (date)";

const PAYMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS payments (
    student_id INTEGER NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    amount INTEGER NOT NULL,
    paid_at INTEGER NOT NULL,
    PRIMARY KEY (student_id, year, month)
)"#;

/// Key/value admin settings.
const SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)"#;

const GRACE_PERIOD_KEY: &str = "grace_period_minutes";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// SQLite repository. Safe to share via Arc; each call opens a lightweight connection.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteRepo {
    /// Connect to (or create) `school.db` under `base_dir` and ensure the schema exists.
    /// Seeds the grace period with its default on a fresh database.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(DomainError::persistence)?;
        let db_path = base.join("school.db");
        let db = libsql::Builder::new_local(&db_path)
            .build()
            .await
            .map_err(DomainError::persistence)?;
        let conn = db.connect().map_err(DomainError::persistence)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Persistence(format!("{} failed: {}", pragma, e)))?;
            while rows
                .next()
                .await
                .map_err(DomainError::persistence)?
                .is_some()
            {}
        }

        for ddl in [
            GROUPS_TABLE,
            STUDENTS_TABLE,
            ATTENDANCE_TABLE,
            ATTENDANCE_INDEX,
            PAYMENTS_TABLE,
            SETTINGS_TABLE,
        ] {
            conn.execute(ddl, ())
                .await
                .map_err(DomainError::persistence)?;
        }

        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            params![GRACE_PERIOD_KEY, GracePeriod::DEFAULT_MINUTES.to_string()],
        )
        .await
        .map_err(DomainError::persistence)?;

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(DomainError::persistence)
    }

    fn row_to_group(row: &Row) -> Result<Group, DomainError> {
        let start: String = row.get(3).map_err(DomainError::persistence)?;
        Ok(Group {
            id: row.get(0).map_err(DomainError::persistence)?,
            name: row.get(1).map_err(DomainError::persistence)?,
            pattern: row.get(2).map_err(DomainError::persistence)?,
            start_time: parse_time(&start)?,
            active: row.get::<i64>(4).map_err(DomainError::persistence)? != 0,
        })
    }

    fn row_to_student(row: &Row) -> Result<Student, DomainError> {
        Ok(Student {
            id: row.get(0).map_err(DomainError::persistence)?,
            full_name: row.get(1).map_err(DomainError::persistence)?,
            qr_code: row.get(2).map_err(DomainError::persistence)?,
            group_id: row.get(3).map_err(DomainError::persistence)?,
            active: row.get::<i64>(4).map_err(DomainError::persistence)? != 0,
        })
    }

    fn row_to_attendance(row: &Row) -> Result<AttendanceRecord, DomainError> {
        let date: String = row.get(1).map_err(DomainError::persistence)?;
        let status: String = row.get(2).map_err(DomainError::persistence)?;
        let recorded_at: i64 = row.get(4).map_err(DomainError::persistence)?;
        Ok(AttendanceRecord {
            student_id: row.get(0).map_err(DomainError::persistence)?,
            date: parse_date(&date)?,
            status: AttendanceStatus::parse(&status).ok_or_else(|| {
                DomainError::Persistence(format!("unknown attendance status '{}'", status))
            })?,
            group_id: row.get(3).map_err(DomainError::persistence)?,
            recorded_at: from_unix(recorded_at)?,
        })
    }

    fn row_to_payment(row: &Row) -> Result<Payment, DomainError> {
        let year: i64 = row.get(1).map_err(DomainError::persistence)?;
        let month: i64 = row.get(2).map_err(DomainError::persistence)?;
        let paid_at: i64 = row.get(4).map_err(DomainError::persistence)?;
        Ok(Payment {
            student_id: row.get(0).map_err(DomainError::persistence)?,
            year: narrow(year, "payment year")?,
            month: narrow(month, "payment month")?,
            amount: row.get(3).map_err(DomainError::persistence)?,
            paid_at: from_unix(paid_at)?,
        })
    }

    async fn query_students(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Student>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(DomainError::persistence)?;
        let mut students = Vec::new();
        while let Some(row) = rows.next().await.map_err(DomainError::persistence)? {
            students.push(Self::row_to_student(&row)?);
        }
        Ok(students)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DomainError::Persistence(format!("bad date '{}': {}", s, e)))
}

fn parse_time(s: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| DomainError::Persistence(format!("bad time '{}': {}", s, e)))
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| DomainError::Persistence(format!("bad timestamp {}", secs)))
}

/// Checked conversion of a stored integer column.
fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T, DomainError> {
    T::try_from(value)
        .map_err(|_| DomainError::Persistence(format!("{} {} is out of range", column, value)))
}

fn is_qr_conflict(e: &libsql::Error) -> bool {
    let msg = e.to_string();
    msg.contains("UNIQUE constraint failed") && msg.contains("qr_code")
}

fn month_prefix(year: i32, month: u32) -> String {
    format!("{:04}-{:02}-%", year, month)
}

#[async_trait::async_trait]
impl SettingsPort for SqliteRepo {
    async fn grace_period_minutes(&self) -> Result<u32, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE key = ?1",
                params![GRACE_PERIOD_KEY],
            )
            .await
            .map_err(DomainError::persistence)?;
        let row = rows
            .next()
            .await
            .map_err(DomainError::persistence)?
            .ok_or_else(|| DomainError::Persistence("grace period setting missing".into()))?;
        let value: String = row.get(0).map_err(DomainError::persistence)?;
        value.trim().parse::<u32>().map_err(|e| {
            DomainError::Persistence(format!("bad grace period value '{}': {}", value, e))
        })
    }

    async fn set_grace_period_minutes(&self, minutes: u32) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
            params![GRACE_PERIOD_KEY, minutes.to_string()],
        )
        .await
        .map_err(DomainError::persistence)?;
        debug!(minutes, "grace period stored");
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterPort for SqliteRepo {
    async fn active_groups(&self) -> Result<Vec<Group>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, pattern, start_time, active FROM groups WHERE active = 1 ORDER BY id",
                (),
            )
            .await
            .map_err(DomainError::persistence)?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next().await.map_err(DomainError::persistence)? {
            groups.push(Self::row_to_group(&row)?);
        }
        Ok(groups)
    }

    async fn group(&self, group_id: i64) -> Result<Option<Group>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, pattern, start_time, active FROM groups WHERE id = ?1",
                params![group_id],
            )
            .await
            .map_err(DomainError::persistence)?;
        match rows.next().await.map_err(DomainError::persistence)? {
            Some(row) => Ok(Some(Self::row_to_group(&row)?)),
            None => Ok(None),
        }
    }

    async fn add_group(
        &self,
        name: &str,
        pattern: RecurrencePattern,
        start_time: NaiveTime,
    ) -> Result<Group, DomainError> {
        let conn = self.conn()?;
        let start = start_time.format(TIME_FORMAT).to_string();
        conn.execute(
            "INSERT INTO groups (name, pattern, start_time, active) VALUES (?1, ?2, ?3, 1)",
            params![name, pattern.code(), start],
        )
        .await
        .map_err(DomainError::persistence)?;
        let id = conn.last_insert_rowid();
        info!(group_id = id, name, pattern = %pattern, "group added");
        Ok(Group {
            id,
            name: name.to_string(),
            pattern: pattern.code().to_string(),
            start_time,
            active: true,
        })
    }

    async fn set_group_active(&self, group_id: i64, active: bool) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE groups SET active = ?1 WHERE id = ?2",
                params![i64::from(active), group_id],
            )
            .await
            .map_err(DomainError::persistence)?;
        if changed > 0 {
            info!(group_id, active, "group active flag changed");
        }
        Ok(changed > 0)
    }

    async fn students_in_group(&self, group_id: i64) -> Result<Vec<Student>, DomainError> {
        self.query_students(
            "SELECT id, full_name, qr_code, group_id, active FROM students WHERE group_id = ?1 AND active = 1 ORDER BY id",
            params![group_id],
        )
        .await
    }

    async fn student(&self, student_id: i64) -> Result<Option<Student>, DomainError> {
        Ok(self
            .query_students(
                "SELECT id, full_name, qr_code, group_id, active FROM students WHERE id = ?1",
                params![student_id],
            )
            .await?
            .into_iter()
            .next())
    }

    async fn student_by_qr(&self, qr_code: &str) -> Result<Option<Student>, DomainError> {
        Ok(self
            .query_students(
                "SELECT id, full_name, qr_code, group_id, active FROM students WHERE qr_code = ?1",
                params![qr_code],
            )
            .await?
            .into_iter()
            .next())
    }

    async fn add_student(
        &self,
        full_name: &str,
        qr_code: &str,
        group_id: i64,
    ) -> Result<Student, DomainError> {
        // The UNIQUE index on qr_code is the only check, so concurrent inserts cannot both pass.
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO students (full_name, qr_code, group_id, active) VALUES (?1, ?2, ?3, 1)",
            params![full_name, qr_code, group_id],
        )
        .await
        .map_err(|e| {
            if is_qr_conflict(&e) {
                DomainError::Validation(format!("QR code '{}' is already assigned", qr_code))
            } else {
                DomainError::persistence(e)
            }
        })?;
        let id = conn.last_insert_rowid();
        info!(student_id = id, group_id, "student added");
        Ok(Student {
            id,
            full_name: full_name.to_string(),
            qr_code: qr_code.to_string(),
            group_id,
            active: true,
        })
    }

    async fn set_student_active(&self, student_id: i64, active: bool) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE students SET active = ?1 WHERE id = ?2",
                params![i64::from(active), student_id],
            )
            .await
            .map_err(DomainError::persistence)?;
        Ok(changed > 0)
    }

    async fn list_students(&self) -> Result<Vec<Student>, DomainError> {
        self.query_students(
            "SELECT id, full_name, qr_code, group_id, active FROM students ORDER BY id",
            (),
        )
        .await
    }
}

#[async_trait::async_trait]
impl AttendancePort for SqliteRepo {
    async fn attended_student_ids(&self, date: NaiveDate) -> Result<HashSet<i64>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT student_id FROM attendance WHERE date = ?1 AND status IN ('present', 'makeup')",
                params![date.format(DATE_FORMAT).to_string()],
            )
            .await
            .map_err(DomainError::persistence)?;
        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await.map_err(DomainError::persistence)? {
            let id: i64 = row.get(0).map_err(DomainError::persistence)?;
            ids.insert(id);
        }
        Ok(ids)
    }

    async fn attendance_status(
        &self,
        student_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceStatus>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT status FROM attendance WHERE student_id = ?1 AND date = ?2",
                params![student_id, date.format(DATE_FORMAT).to_string()],
            )
            .await
            .map_err(DomainError::persistence)?;
        let Some(row) = rows.next().await.map_err(DomainError::persistence)? else {
            return Ok(None);
        };
        let status: String = row.get(0).map_err(DomainError::persistence)?;
        AttendanceStatus::parse(&status).map(Some).ok_or_else(|| {
            DomainError::Persistence(format!("unknown attendance status '{}'", status))
        })
    }

    async fn record_attendance(&self, record: &AttendanceRecord) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                r#"
                INSERT INTO attendance (student_id, date, status, group_id, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (student_id, date) DO NOTHING
                "#,
                params![
                    record.student_id,
                    record.date.format(DATE_FORMAT).to_string(),
                    record.status.as_str(),
                    record.group_id,
                    record.recorded_at.timestamp()
                ],
            )
            .await
            .map_err(DomainError::persistence)?;
        Ok(inserted > 0)
    }

    async fn mark_absent(
        &self,
        student_id: i64,
        group_id: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
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
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT student_id, date, status, group_id, recorded_at
                FROM attendance
                WHERE date LIKE ?1
                ORDER BY date, student_id
                "#,
                params![month_prefix(year, month)],
            )
            .await
            .map_err(DomainError::persistence)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(DomainError::persistence)? {
            records.push(Self::row_to_attendance(&row)?);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl PaymentPort for SqliteRepo {
    async fn record_payment(&self, payment: &Payment) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                r#"
                INSERT INTO payments (student_id, year, month, amount, paid_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (student_id, year, month) DO NOTHING
                "#,
                params![
                    payment.student_id,
                    i64::from(payment.year),
                    i64::from(payment.month),
                    payment.amount,
                    payment.paid_at.timestamp()
                ],
            )
            .await
            .map_err(DomainError::persistence)?;
        Ok(inserted > 0)
    }

    async fn payments_for_month(&self, year: i32, month: u32) -> Result<Vec<Payment>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT student_id, year, month, amount, paid_at
                FROM payments
                WHERE year = ?1 AND month = ?2
                ORDER BY student_id
                "#,
                params![i64::from(year), i64::from(month)],
            )
            .await
            .map_err(DomainError::persistence)?;
        let mut payments = Vec::new();
        while let Some(row) = rows.next().await.map_err(DomainError::persistence)? {
            payments.push(Self::row_to_payment(&row)?);
        }
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn fresh_database_seeds_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        assert!(repo.db_path().ends_with("school.db"));
        assert_eq!(repo.grace_period_minutes().await.unwrap(), 15);

        repo.set_grace_period_minutes(30).await.unwrap();
        assert_eq!(repo.grace_period_minutes().await.unwrap(), 30);

        // Reconnecting keeps the stored value rather than reseeding.
        drop(repo);
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        assert_eq!(repo.grace_period_minutes().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn roster_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        let start = NaiveTime::from_hms_opt(16, 30, 0).unwrap();
        let group = repo
            .add_group("Grade 9 A", RecurrencePattern::SatTueThu, start)
            .await
            .unwrap();
        let s1 = repo.add_student("Mona Adel", "QR-1", group.id).await.unwrap();
        let s2 = repo.add_student("Omar Said", "QR-2", group.id).await.unwrap();

        let dup = repo.add_student("Someone", "QR-1", group.id).await;
        assert!(matches!(dup, Err(DomainError::Validation(_))));

        let loaded = repo.group(group.id).await.unwrap().unwrap();
        assert_eq!(loaded.start_time, start);
        assert_eq!(loaded.pattern, "SAT_TUE_THU");
        assert_eq!(repo.active_groups().await.unwrap().len(), 1);

        assert_eq!(
            repo.student_by_qr("QR-2").await.unwrap().map(|s| s.id),
            Some(s2.id)
        );
        assert!(repo.set_student_active(s1.id, false).await.unwrap());
        assert!(!repo.set_student_active(9999, false).await.unwrap());

        assert!(repo.set_group_active(group.id, false).await.unwrap());
        assert!(repo.active_groups().await.unwrap().is_empty());
        assert!(!repo.group(group.id).await.unwrap().unwrap().active);
        assert!(!repo.set_group_active(9999, false).await.unwrap());

        let in_group = repo.students_in_group(group.id).await.unwrap();
        assert_eq!(in_group.iter().map(|s| s.id).collect::<Vec<_>>(), vec![s2.id]);
        assert_eq!(repo.list_students().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn attendance_is_unique_per_student_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        let day = date(2025, 3, 4);

        let present = AttendanceRecord {
            student_id: 1,
            date: day,
            status: AttendanceStatus::Present,
            group_id: 1,
            recorded_at: at(1_741_104_000),
        };
        assert!(repo.record_attendance(&present).await.unwrap());
        assert!(!repo.record_attendance(&present).await.unwrap());
        assert!(!repo.mark_absent(1, 1, day, at(1_741_110_000)).await.unwrap());

        assert!(repo.mark_absent(2, 1, day, at(1_741_110_000)).await.unwrap());
        assert!(!repo.mark_absent(2, 1, day, at(1_741_110_060)).await.unwrap());

        assert_eq!(
            repo.attendance_status(2, day).await.unwrap(),
            Some(AttendanceStatus::Absent)
        );
        assert_eq!(repo.attendance_status(3, day).await.unwrap(), None);

        let attended = repo.attended_student_ids(day).await.unwrap();
        assert_eq!(attended, HashSet::from([1]));

        let month = repo.attendance_for_month(2025, 3).await.unwrap();
        assert_eq!(month.len(), 2);
        assert_eq!(month[1].status, AttendanceStatus::Absent);
        assert!(repo.attendance_for_month(2025, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn payments_once_per_month() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        let payment = Payment {
            student_id: 7,
            year: 2025,
            month: 3,
            amount: 45_000,
            paid_at: at(1_741_000_000),
        };
        assert!(repo.record_payment(&payment).await.unwrap());
        assert!(!repo.record_payment(&payment).await.unwrap());
        let march = repo.payments_for_month(2025, 3).await.unwrap();
        assert_eq!(march, vec![payment]);
        assert!(repo.payments_for_month(2025, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_stored_columns_are_rejected_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        let conn = repo.conn().unwrap();
        conn.execute(
            "INSERT INTO payments (student_id, year, month, amount, paid_at) VALUES (1, 2025, ?1, 100, 0)",
            params![u32::MAX as i64 + 4],
        )
        .await
        .unwrap();
        let mut rows = conn
            .query("SELECT student_id, year, month, amount, paid_at FROM payments", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert!(matches!(
            SqliteRepo::row_to_payment(&row),
            Err(DomainError::Persistence(_))
        ));

        assert_eq!(narrow::<u32>(12, "month").unwrap(), 12);
        assert!(narrow::<i32>(i64::MAX, "year").is_err());
        assert!(narrow::<u32>(-1, "month").is_err());
    }
}
