//! Application use cases. Orchestrate domain logic via ports.

pub mod absence_processor;
pub mod absence_scheduler;
pub mod admin_service;
pub mod check_in_service;
pub mod grace_period;
pub mod payment_service;
pub mod report_service;
pub mod roster_service;

pub use absence_processor::{AbsenceProcessor, ProcessReport};
pub use absence_scheduler::AbsenceScheduler;
pub use admin_service::{AdminReply, AdminService};
pub use check_in_service::{CheckInOutcome, CheckInService};
pub use grace_period::GracePeriodStore;
pub use payment_service::PaymentService;
pub use report_service::ReportService;
pub use roster_service::RosterService;
