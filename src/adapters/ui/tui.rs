//! Implements AdminPort. Inquire-based admin console.
//!
//! One menu loop; each entry prompts for its inputs and calls a single use case.
//! Failures are printed and the loop continues. Quitting stops the scheduler.

use crate::domain::{DomainError, Group, RecurrencePattern, Student};
use crate::ports::{AdminPort, Clock};
use crate::usecases::{
    AdminReply, AdminService, CheckInOutcome, CheckInService, PaymentService, ReportService,
    RosterService,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Applies the neon prompt theme globally.
pub fn apply_theme() {
    let mut config = RenderConfig::default_colored();
    config.prompt_prefix = Styled::new(">").with_fg(Color::LightMagenta);
    config.highlighted_option_prefix = Styled::new(">>").with_fg(Color::LightCyan);
    config.answer = StyleSheet::new().with_fg(Color::LightCyan);
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    StartScheduler,
    StopScheduler,
    RunOnce,
    SetGracePeriod,
    CheckIn,
    CheckInMakeup,
    RecordPayment,
    UnpaidList,
    MonthlyReport,
    AddGroup,
    AddStudent,
    DeactivateStudent,
    DeactivateGroup,
    ListStudents,
    GroupCalendar,
    Quit,
}

impl MenuAction {
    const ALL: [Self; 16] = [
        Self::StartScheduler,
        Self::StopScheduler,
        Self::RunOnce,
        Self::SetGracePeriod,
        Self::CheckIn,
        Self::CheckInMakeup,
        Self::RecordPayment,
        Self::UnpaidList,
        Self::MonthlyReport,
        Self::AddGroup,
        Self::AddStudent,
        Self::DeactivateStudent,
        Self::DeactivateGroup,
        Self::ListStudents,
        Self::GroupCalendar,
        Self::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StartScheduler => "Start auto-absence scheduler",
            Self::StopScheduler => "Stop auto-absence scheduler",
            Self::RunOnce => "Run absence check now",
            Self::SetGracePeriod => "Set grace period",
            Self::CheckIn => "Check in (QR)",
            Self::CheckInMakeup => "Check in makeup (QR)",
            Self::RecordPayment => "Record payment",
            Self::UnpaidList => "Unpaid students",
            Self::MonthlyReport => "Monthly attendance report",
            Self::AddGroup => "Add group",
            Self::AddStudent => "Add student",
            Self::DeactivateStudent => "Deactivate student",
            Self::DeactivateGroup => "Deactivate group",
            Self::ListStudents => "List students",
            Self::GroupCalendar => "Group calendar",
            Self::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// Select option carrying a value behind a display label.
struct Pick<T> {
    label: String,
    value: T,
}

impl<T> fmt::Display for Pick<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn group_pick(g: &Group) -> Pick<i64> {
    Pick {
        label: format!("{} [{} {}] #{}", g.name, g.pattern, g.start_time.format("%H:%M"), g.id),
        value: g.id,
    }
}

fn student_pick(s: &Student) -> Pick<i64> {
    Pick {
        label: format!("{} (QR {}) #{}", s.full_name, s.qr_code, s.id),
        value: s.id,
    }
}

fn prompt_err(e: InquireError) -> DomainError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            DomainError::Console("cancelled".to_string())
        }
        other => DomainError::Console(other.to_string()),
    }
}

/// Parse `YYYY-MM` into (year, month).
fn parse_year_month(input: &str) -> Result<(i32, u32), DomainError> {
    let bad = || DomainError::Validation(format!("'{}' is not YYYY-MM", input.trim()));
    let (y, m) = input.trim().split_once('-').ok_or_else(bad)?;
    let year: i32 = y.parse().map_err(|_| bad())?;
    let month: u32 = m.parse().map_err(|_| bad())?;
    if !(1..=12).contains(&month) {
        return Err(bad());
    }
    Ok((year, month))
}

fn print_reply(reply: &AdminReply) {
    let mark = if reply.success { "+" } else { "!" };
    println!("[{}] {}", mark, reply.message);
}

fn describe_check_in(outcome: &CheckInOutcome) -> String {
    match outcome {
        CheckInOutcome::Recorded { student, status } => {
            format!("{} checked in ({})", student.full_name, status.as_str())
        }
        CheckInOutcome::AlreadyRecorded { student, status } => {
            format!(
                "{} is already recorded as {} today",
                student.full_name,
                status.as_str()
            )
        }
    }
}

/// TUI adapter. Inquire prompts over the admin, roster, check-in, payment and report services.
pub struct TuiAdminPort {
    admin: Arc<AdminService>,
    roster: Arc<RosterService>,
    check_in: Arc<CheckInService>,
    payments: Arc<PaymentService>,
    reports: Arc<ReportService>,
    clock: Arc<dyn Clock>,
}

impl TuiAdminPort {
    pub fn new(
        admin: Arc<AdminService>,
        roster: Arc<RosterService>,
        check_in: Arc<CheckInService>,
        payments: Arc<PaymentService>,
        reports: Arc<ReportService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admin,
            roster,
            check_in,
            payments,
            reports,
            clock,
        }
    }

    fn current_month(&self) -> String {
        self.clock.now().date_naive().format("%Y-%m").to_string()
    }

    fn ask_year_month(&self, message: &str) -> Result<(i32, u32), DomainError> {
        let input = Text::new(message)
            .with_default(&self.current_month())
            .prompt()
            .map_err(prompt_err)?;
        parse_year_month(&input)
    }

    async fn pick_group(&self, message: &str) -> Result<i64, DomainError> {
        let options: Vec<Pick<i64>> = self.roster.active_groups().await?.iter().map(group_pick).collect();
        if options.is_empty() {
            return Err(DomainError::NotFound("no active groups".to_string()));
        }
        Ok(Select::new(message, options).prompt().map_err(prompt_err)?.value)
    }

    async fn pick_student(&self, message: &str) -> Result<i64, DomainError> {
        let options: Vec<Pick<i64>> = self
            .roster
            .list_students()
            .await?
            .iter()
            .filter(|s| s.active)
            .map(student_pick)
            .collect();
        if options.is_empty() {
            return Err(DomainError::NotFound("no active students".to_string()));
        }
        Ok(Select::new(message, options).prompt().map_err(prompt_err)?.value)
    }

    async fn set_grace_period(&self) -> Result<(), DomainError> {
        let current = self.admin.grace_period().await;
        print_reply(&current);
        let minutes = CustomType::<u32>::new("Grace period (minutes, 5-60):")
            .with_error_message("Enter a whole number of minutes")
            .prompt()
            .map_err(prompt_err)?;
        print_reply(&self.admin.set_grace_period(minutes).await);
        Ok(())
    }

    async fn check_in(&self, makeup: bool) -> Result<(), DomainError> {
        let qr = Text::new("Scan QR code:").prompt().map_err(prompt_err)?;
        let now = self.clock.now();
        let outcome = if makeup {
            let host = self.pick_group("Attending session of group:").await?;
            self.check_in.check_in_makeup(&qr, host, now).await?
        } else {
            self.check_in.check_in(&qr, now).await?
        };
        println!("[+] {}", describe_check_in(&outcome));
        Ok(())
    }

    async fn record_payment(&self) -> Result<(), DomainError> {
        let student_id = self.pick_student("Student:").await?;
        let (year, month) = self.ask_year_month("Month (YYYY-MM):")?;
        let amount = CustomType::<i64>::new("Amount:")
            .with_error_message("Enter a whole amount")
            .prompt()
            .map_err(prompt_err)?;
        let payment = self
            .payments
            .record_payment(student_id, year, month, amount, self.clock.now())
            .await?;
        println!(
            "[+] Payment of {} recorded for {:04}-{:02}",
            payment.amount, payment.year, payment.month
        );
        Ok(())
    }

    async fn unpaid_list(&self) -> Result<(), DomainError> {
        let (year, month) = self.ask_year_month("Month (YYYY-MM):")?;
        let unpaid = self.payments.unpaid_students(year, month).await?;
        if unpaid.is_empty() {
            println!("[+] Everyone has paid for {:04}-{:02}", year, month);
        }
        for s in &unpaid {
            println!("  - {} (QR {}) #{}", s.full_name, s.qr_code, s.id);
        }
        Ok(())
    }

    async fn monthly_report(&self) -> Result<(), DomainError> {
        let (year, month) = self.ask_year_month("Month (YYYY-MM):")?;
        let today = self.clock.now().date_naive();
        let report = self.reports.monthly_summary(year, month, today).await?;
        for row in &report.rows {
            println!(
                "  {:<24} {:<16} expected {:>2}  present {:>2}  makeup {:>2}  absent {:>2}",
                row.full_name, row.group_name, row.expected_sessions, row.present, row.makeup, row.absent
            );
        }
        let export = Confirm::new("Export CSV and JSON?")
            .with_default(true)
            .prompt()
            .map_err(prompt_err)?;
        if export {
            let csv = self.reports.export_csv(&report).await?;
            let json = self.reports.export_json(&report).await?;
            println!("[+] Report written to {} and {}", csv.display(), json.display());
        }
        Ok(())
    }

    async fn add_group(&self) -> Result<(), DomainError> {
        let name = Text::new("Group name:").prompt().map_err(prompt_err)?;
        let pattern = Select::new("Schedule:", RecurrencePattern::ALL.to_vec())
            .prompt()
            .map_err(prompt_err)?;
        let start = Text::new("Start time (HH:MM, UTC):")
            .with_default("16:00")
            .prompt()
            .map_err(prompt_err)?;
        let group = self.roster.add_group(&name, pattern.code(), &start).await?;
        println!("[+] Group '{}' created #{}", group.name, group.id);
        Ok(())
    }

    async fn add_student(&self) -> Result<(), DomainError> {
        let group_id = self.pick_group("Group:").await?;
        let name = Text::new("Full name:").prompt().map_err(prompt_err)?;
        let qr = Text::new("QR code:").prompt().map_err(prompt_err)?;
        let student = self.roster.add_student(&name, &qr, group_id).await?;
        println!("[+] Student '{}' added #{}", student.full_name, student.id);
        Ok(())
    }

    async fn deactivate_student(&self) -> Result<(), DomainError> {
        let student_id = self.pick_student("Deactivate:").await?;
        self.roster.deactivate_student(student_id).await?;
        println!("[+] Student #{} deactivated", student_id);
        Ok(())
    }

    async fn deactivate_group(&self) -> Result<(), DomainError> {
        let group_id = self.pick_group("Deactivate group:").await?;
        let confirmed = Confirm::new("Stop check-ins and auto-absences for this group?")
            .with_default(false)
            .prompt()
            .map_err(prompt_err)?;
        if confirmed {
            self.roster.deactivate_group(group_id).await?;
            println!("[+] Group #{} deactivated", group_id);
        }
        Ok(())
    }

    async fn list_students(&self) -> Result<(), DomainError> {
        for s in self.roster.list_students().await? {
            let state = if s.active { "" } else { " (inactive)" };
            println!("  #{} {} QR {} group #{}{}", s.id, s.full_name, s.qr_code, s.group_id, state);
        }
        Ok(())
    }

    async fn group_calendar(&self) -> Result<(), DomainError> {
        let group_id = self.pick_group("Group:").await?;
        let (year, month) = self.ask_year_month("Month (YYYY-MM):")?;
        let dates = self.roster.group_calendar(group_id, year, month).await?;
        let days: Vec<String> = dates.iter().map(format_day).collect();
        println!("  {} session(s): {}", dates.len(), days.join(", "));
        Ok(())
    }

    async fn dispatch(&self, action: MenuAction) -> Result<(), DomainError> {
        match action {
            MenuAction::StartScheduler => print_reply(&self.admin.start_scheduler()),
            MenuAction::StopScheduler => print_reply(&self.admin.stop_scheduler()),
            MenuAction::RunOnce => print_reply(&self.admin.run_once().await),
            MenuAction::SetGracePeriod => self.set_grace_period().await?,
            MenuAction::CheckIn => self.check_in(false).await?,
            MenuAction::CheckInMakeup => self.check_in(true).await?,
            MenuAction::RecordPayment => self.record_payment().await?,
            MenuAction::UnpaidList => self.unpaid_list().await?,
            MenuAction::MonthlyReport => self.monthly_report().await?,
            MenuAction::AddGroup => self.add_group().await?,
            MenuAction::AddStudent => self.add_student().await?,
            MenuAction::DeactivateStudent => self.deactivate_student().await?,
            MenuAction::DeactivateGroup => self.deactivate_group().await?,
            MenuAction::ListStudents => self.list_students().await?,
            MenuAction::GroupCalendar => self.group_calendar().await?,
            MenuAction::Quit => {}
        }
        Ok(())
    }
}

fn format_day(d: &NaiveDate) -> String {
    format!("{} {:02}", d.format("%a"), d.day())
}

#[async_trait]
impl AdminPort for TuiAdminPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let state = if self.admin.scheduler_running() {
                "running"
            } else {
                "stopped"
            };
            let title = format!("School desk (scheduler {}):", state);
            let action = match Select::new(&title, MenuAction::ALL.to_vec())
                .with_page_size(MenuAction::ALL.len())
                .prompt()
            {
                Ok(action) => action,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    MenuAction::Quit
                }
                Err(e) => {
                    self.admin.stop_scheduler();
                    return Err(DomainError::Console(e.to_string()));
                }
            };

            if action == MenuAction::Quit {
                print_reply(&self.admin.stop_scheduler());
                return Ok(());
            }

            if let Err(e) = self.dispatch(action).await {
                warn!(action = %action, error = %e, "admin action failed");
                println!("[!] {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttendanceStatus;

    #[test]
    fn year_month_parsing() {
        assert_eq!(parse_year_month("2025-03").unwrap(), (2025, 3));
        assert_eq!(parse_year_month(" 2024-12 ").unwrap(), (2024, 12));
        assert!(parse_year_month("2025-13").is_err());
        assert!(parse_year_month("March").is_err());
    }

    #[test]
    fn menu_ends_with_quit() {
        assert_eq!(MenuAction::ALL.last(), Some(&MenuAction::Quit));
        assert_eq!(MenuAction::RunOnce.to_string(), "Run absence check now");
    }

    #[test]
    fn check_in_descriptions() {
        let student = Student {
            id: 1,
            full_name: "Mona".into(),
            qr_code: "Q1".into(),
            group_id: 1,
            active: true,
        };
        let recorded = CheckInOutcome::Recorded {
            student: student.clone(),
            status: AttendanceStatus::Makeup,
        };
        assert_eq!(describe_check_in(&recorded), "Mona checked in (makeup)");
        let again = CheckInOutcome::AlreadyRecorded {
            student,
            status: AttendanceStatus::Absent,
        };
        assert_eq!(describe_check_in(&again), "Mona is already recorded as absent today");
    }

    #[test]
    fn calendar_day_format() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(format_day(&d), "Sat 01");
    }
}
