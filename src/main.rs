//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use school_desk::adapters::clock::SystemClock;
use school_desk::adapters::persistence::SqliteRepo;
use school_desk::adapters::ui::{StartupStatus, tui::TuiAdminPort};
use school_desk::ports::{AdminPort, AttendancePort, Clock, PaymentPort, RosterPort, SettingsPort};
use school_desk::shared::config::AppConfig;
use school_desk::usecases::{
    AbsenceProcessor, AbsenceScheduler, AdminService, CheckInService, GracePeriodStore,
    PaymentService, ReportService, RosterService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config could not be loaded, using defaults");
        AppConfig::default()
    });

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    let sqlite_repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );
    let settings: Arc<dyn SettingsPort> = Arc::clone(&sqlite_repo) as Arc<dyn SettingsPort>;
    let roster: Arc<dyn RosterPort> = Arc::clone(&sqlite_repo) as Arc<dyn RosterPort>;
    let attendance: Arc<dyn AttendancePort> = Arc::clone(&sqlite_repo) as Arc<dyn AttendancePort>;
    let payments: Arc<dyn PaymentPort> = Arc::clone(&sqlite_repo) as Arc<dyn PaymentPort>;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- Absence pipeline: grace store -> processor -> scheduler ---
    let session_minutes = cfg.session_duration_minutes_or_default();
    let session_duration = chrono::Duration::minutes(session_minutes);
    let tick_secs = cfg.absence_tick_secs_or_default();
    info!(tick_secs, session_minutes, "absence scheduler timing");

    let grace = Arc::new(GracePeriodStore::new(Arc::clone(&settings)));
    let processor = Arc::new(AbsenceProcessor::new(
        Arc::clone(&grace),
        Arc::clone(&roster),
        Arc::clone(&attendance),
        session_duration,
    ));
    let scheduler = Arc::new(AbsenceScheduler::new(
        processor,
        Arc::clone(&clock),
        Duration::from_secs(tick_secs),
    ));

    // --- Services ---
    let admin = Arc::new(AdminService::new(Arc::clone(&scheduler), Arc::clone(&grace)));
    let roster_service = Arc::new(RosterService::new(Arc::clone(&roster)));
    let check_in_service = Arc::new(CheckInService::new(
        Arc::clone(&roster),
        Arc::clone(&attendance),
        Arc::clone(&grace),
        session_duration,
    ));
    let payment_service = Arc::new(PaymentService::new(Arc::clone(&roster), payments));
    let reports_dir = PathBuf::from(cfg.reports_dir_or_default());
    let report_service = Arc::new(ReportService::new(roster, attendance, reports_dir));

    if cfg.autostart_scheduler_or_default() {
        let reply = admin.start_scheduler();
        info!(message = %reply.message, "scheduler autostart");
    }

    let data_dir = cfg.data_dir_or_default();
    school_desk::adapters::ui::init_ui(&StartupStatus {
        data_dir: &data_dir,
        scheduler_running: admin.scheduler_running(),
        tick_secs,
        grace_minutes: grace.get().await.ok().map(|g| g.minutes()),
    });

    let input_port: Arc<dyn AdminPort> = Arc::new(TuiAdminPort::new(
        Arc::clone(&admin),
        roster_service,
        check_in_service,
        payment_service,
        report_service,
        clock,
    ));

    // --- Run (admin menu until Quit) ---
    let result = input_port.run().await;
    scheduler.stop();
    result.map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("bye");
    Ok(())
}
