//! Admin trigger surface. Each operation maps 1:1 onto a scheduler or settings operation
//! and reports back a success flag plus a human-readable message; nothing here fails the caller.

use crate::usecases::absence_scheduler::AbsenceScheduler;
use crate::usecases::grace_period::GracePeriodStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

/// Summary returned to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminReply {
    pub success: bool,
    pub message: String,
}

impl AdminReply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub struct AdminService {
    scheduler: Arc<AbsenceScheduler>,
    grace: Arc<GracePeriodStore>,
}

impl AdminService {
    pub fn new(scheduler: Arc<AbsenceScheduler>, grace: Arc<GracePeriodStore>) -> Self {
        Self { scheduler, grace }
    }

    pub fn start_scheduler(&self) -> AdminReply {
        if self.scheduler.start() {
            AdminReply::ok(format!(
                "Auto-absence scheduler started (every {}s)",
                self.scheduler.interval().as_secs()
            ))
        } else {
            AdminReply::ok("Auto-absence scheduler is already running")
        }
    }

    pub fn stop_scheduler(&self) -> AdminReply {
        if self.scheduler.stop() {
            AdminReply::ok("Auto-absence scheduler stopped")
        } else {
            AdminReply::ok("Auto-absence scheduler was not running")
        }
    }

    pub fn scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub async fn run_once(&self) -> AdminReply {
        match self.scheduler.run_once().await {
            Ok(report) if report.skipped => {
                AdminReply::ok("An absence check is already in progress; nothing to do")
            }
            Ok(report) => {
                let mut message = format!(
                    "Checked {} session(s), marked {} student(s) absent",
                    report.scanned_sessions, report.marked_absent
                );
                if report.failed_writes > 0 {
                    message.push_str(&format!(" ({} write(s) failed)", report.failed_writes));
                }
                AdminReply::ok(message)
            }
            Err(e) => {
                error!(error = %e, "manual absence run failed");
                AdminReply::failed(format!("Absence check failed: {}", e))
            }
        }
    }

    pub async fn set_grace_period(&self, minutes: u32) -> AdminReply {
        match self.grace.set(minutes).await {
            Ok(grace) => AdminReply::ok(format!("Grace period set to {}", grace)),
            Err(e) => {
                warn!(minutes, error = %e, "grace period update rejected");
                AdminReply::failed(e.to_string())
            }
        }
    }

    pub async fn grace_period(&self) -> AdminReply {
        match self.grace.get().await {
            Ok(grace) => AdminReply::ok(format!("Grace period is {}", grace)),
            Err(e) => AdminReply::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::persistence::MemoryRepo;
    use crate::usecases::absence_processor::AbsenceProcessor;
    use chrono::Utc;
    use std::time::Duration;

    fn admin(repo: Arc<MemoryRepo>) -> AdminService {
        let grace = Arc::new(GracePeriodStore::new(repo.clone()));
        let processor = Arc::new(AbsenceProcessor::new(
            Arc::clone(&grace),
            repo.clone(),
            repo,
            chrono::Duration::minutes(120),
        ));
        let scheduler = Arc::new(AbsenceScheduler::new(
            processor,
            Arc::new(FixedClock::new(Utc::now())),
            Duration::from_secs(300),
        ));
        AdminService::new(scheduler, grace)
    }

    #[tokio::test]
    async fn start_stop_are_idempotent() {
        let admin = admin(Arc::new(MemoryRepo::new()));
        let first = admin.start_scheduler();
        assert!(first.success);
        assert!(first.message.contains("started"));
        assert!(admin.start_scheduler().message.contains("already running"));
        assert!(admin.scheduler_running());
        assert!(admin.stop_scheduler().message.contains("stopped"));
        assert!(admin.stop_scheduler().message.contains("not running"));
    }

    #[tokio::test]
    async fn grace_period_replies() {
        let admin = admin(Arc::new(MemoryRepo::new()));
        assert!(!admin.set_grace_period(4).await.success);
        assert!(!admin.set_grace_period(61).await.success);
        let reply = admin.set_grace_period(30).await;
        assert!(reply.success);
        assert_eq!(admin.grace_period().await.message, "Grace period is 30 min");
    }

    #[tokio::test]
    async fn run_once_reports_failure_without_panicking() {
        let repo = Arc::new(MemoryRepo::new());
        repo.fail_settings(true);
        let admin = admin(repo.clone());
        let reply = admin.run_once().await;
        assert!(!reply.success);
        assert!(reply.message.starts_with("Absence check failed"));

        repo.fail_settings(false);
        let reply = admin.run_once().await;
        assert!(reply.success);
        assert!(reply.message.contains("marked 0"));
    }
}
