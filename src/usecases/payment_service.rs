//! Monthly fee tracking. Amounts are entered by the operator; one payment per student per month.

use crate::domain::{DomainError, Payment, Student};
use crate::ports::{PaymentPort, RosterPort};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub struct PaymentService {
    roster: Arc<dyn RosterPort>,
    payments: Arc<dyn PaymentPort>,
}

impl PaymentService {
    pub fn new(roster: Arc<dyn RosterPort>, payments: Arc<dyn PaymentPort>) -> Self {
        Self { roster, payments }
    }

    /// Record a student's payment for `year`/`month`. A second payment for the same month
    /// is rejected with a validation error.
    pub async fn record_payment(
        &self,
        student_id: i64,
        year: i32,
        month: u32,
        amount: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "month must be 1-12, got {}",
                month
            )));
        }
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }
        if self.roster.student(student_id).await?.is_none() {
            return Err(DomainError::NotFound(format!("student {}", student_id)));
        }

        let payment = Payment {
            student_id,
            year,
            month,
            amount,
            paid_at,
        };
        if !self.payments.record_payment(&payment).await? {
            return Err(DomainError::Validation(format!(
                "student {} already paid for {:04}-{:02}",
                student_id, year, month
            )));
        }
        info!(student_id, year, month, amount, "payment recorded");
        Ok(payment)
    }

    /// Active students with no payment for the month, ordered by id.
    pub async fn unpaid_students(&self, year: i32, month: u32) -> Result<Vec<Student>, DomainError> {
        let paid: HashSet<i64> = self
            .payments
            .payments_for_month(year, month)
            .await?
            .into_iter()
            .map(|p| p.student_id)
            .collect();
        Ok(self
            .roster
            .list_students()
            .await?
            .into_iter()
            .filter(|s| s.active && !paid.contains(&s.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::RecurrencePattern;
    use chrono::NaiveTime;

    async fn setup() -> (PaymentService, Vec<i64>) {
        let repo = Arc::new(MemoryRepo::new());
        let g = repo
            .add_group(
                "A",
                RecurrencePattern::SunWed,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            )
            .await
            .unwrap();
        let mut ids = Vec::new();
        for (name, qr) in [("Mona", "Q1"), ("Omar", "Q2"), ("Laila", "Q3")] {
            ids.push(repo.add_student(name, qr, g.id).await.unwrap().id);
        }
        repo.set_student_active(ids[2], false).await.unwrap();
        (PaymentService::new(repo.clone(), repo), ids)
    }

    #[tokio::test]
    async fn unpaid_excludes_payers_and_inactive() {
        let (service, ids) = setup().await;
        service
            .record_payment(ids[0], 2025, 3, 45_000, Utc::now())
            .await
            .unwrap();
        let unpaid = service.unpaid_students(2025, 3).await.unwrap();
        assert_eq!(unpaid.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[1]]);
        assert_eq!(service.unpaid_students(2025, 4).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_invalid_and_duplicate_payments() {
        let (service, ids) = setup().await;
        for (month, amount) in [(0, 100), (13, 100), (3, 0)] {
            assert!(matches!(
                service
                    .record_payment(ids[0], 2025, month, amount, Utc::now())
                    .await,
                Err(DomainError::Validation(_))
            ));
        }
        assert!(matches!(
            service.record_payment(99, 2025, 3, 100, Utc::now()).await,
            Err(DomainError::NotFound(_))
        ));
        service
            .record_payment(ids[0], 2025, 3, 100, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            service.record_payment(ids[0], 2025, 3, 100, Utc::now()).await,
            Err(DomainError::Validation(_))
        ));
    }
}
