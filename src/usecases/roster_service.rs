//! Roster management: groups, students and group calendars.

use crate::domain::{DomainError, Group, RecurrencePattern, Student, session_dates};
use crate::ports::RosterPort;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

pub struct RosterService {
    roster: Arc<dyn RosterPort>,
}

impl RosterService {
    pub fn new(roster: Arc<dyn RosterPort>) -> Self {
        Self { roster }
    }

    /// Create a group. `pattern_code` like `SAT_TUE_THU`, `start` as `HH:MM` (UTC).
    pub async fn add_group(
        &self,
        name: &str,
        pattern_code: &str,
        start: &str,
    ) -> Result<Group, DomainError> {
        let name = non_empty(name, "group name")?;
        let pattern = RecurrencePattern::parse(pattern_code).ok_or_else(|| {
            DomainError::Validation(format!("unknown schedule '{}'", pattern_code))
        })?;
        let start_time = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| {
            DomainError::Validation(format!("start time '{}' is not HH:MM", start))
        })?;
        self.roster.add_group(name, pattern, start_time).await
    }

    pub async fn add_student(
        &self,
        full_name: &str,
        qr_code: &str,
        group_id: i64,
    ) -> Result<Student, DomainError> {
        let full_name = non_empty(full_name, "student name")?;
        let qr_code = non_empty(qr_code, "QR code")?;
        if self.roster.group(group_id).await?.is_none() {
            return Err(DomainError::NotFound(format!("group {}", group_id)));
        }
        self.roster.add_student(full_name, qr_code, group_id).await
    }

    pub async fn deactivate_student(&self, student_id: i64) -> Result<(), DomainError> {
        if self.roster.set_student_active(student_id, false).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("student {}", student_id)))
        }
    }

    /// Stop a group from meeting: no check-ins, no auto-absences, no calendar in the console.
    pub async fn deactivate_group(&self, group_id: i64) -> Result<(), DomainError> {
        if self.roster.set_group_active(group_id, false).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(format!("group {}", group_id)))
        }
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, DomainError> {
        self.roster.list_students().await
    }

    pub async fn active_groups(&self) -> Result<Vec<Group>, DomainError> {
        self.roster.active_groups().await
    }

    /// Session dates of a group in the given month. Unknown stored patterns yield no dates.
    pub async fn group_calendar(
        &self,
        group_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<NaiveDate>, DomainError> {
        let group = self
            .roster
            .group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("group {}", group_id)))?;
        Ok(RecurrencePattern::parse(&group.pattern)
            .map(|p| session_dates(year, month, p))
            .unwrap_or_default())
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::Validation(format!("{} must not be empty", what)))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;

    #[tokio::test]
    async fn validates_group_input() {
        let service = RosterService::new(Arc::new(MemoryRepo::new()));
        assert!(matches!(
            service.add_group("A", "FRI_ONLY", "16:00").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.add_group("A", "SUN_WED", "4pm").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.add_group("  ", "SUN_WED", "16:00").await,
            Err(DomainError::Validation(_))
        ));
        let g = service.add_group(" A ", "sun_wed", "16:00").await.unwrap();
        assert_eq!(g.name, "A");
        assert_eq!(g.pattern, "SUN_WED");
    }

    #[tokio::test]
    async fn students_need_existing_group_and_unique_qr() {
        let service = RosterService::new(Arc::new(MemoryRepo::new()));
        assert!(matches!(
            service.add_student("Mona", "QR-1", 1).await,
            Err(DomainError::NotFound(_))
        ));
        let g = service.add_group("A", "MON_THU", "09:00").await.unwrap();
        let s = service.add_student("Mona", "QR-1", g.id).await.unwrap();
        assert!(matches!(
            service.add_student("Omar", "QR-1", g.id).await,
            Err(DomainError::Validation(_))
        ));
        service.deactivate_student(s.id).await.unwrap();
        assert!(!service.list_students().await.unwrap()[0].active);
        assert!(matches!(
            service.deactivate_student(42).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deactivated_group_leaves_active_list() {
        let service = RosterService::new(Arc::new(MemoryRepo::new()));
        let g = service.add_group("A", "SUN_WED", "16:00").await.unwrap();
        service.deactivate_group(g.id).await.unwrap();
        assert!(service.active_groups().await.unwrap().is_empty());
        assert!(matches!(
            service.deactivate_group(42).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn calendar_follows_pattern() {
        let service = RosterService::new(Arc::new(MemoryRepo::new()));
        let g = service.add_group("A", "SAT_TUE_THU", "16:00").await.unwrap();
        let dates = service.group_calendar(g.id, 2025, 3).await.unwrap();
        assert_eq!(dates.len(), 13);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }
}
