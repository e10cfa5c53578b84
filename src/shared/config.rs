//! Application configuration. Paths, scheduler timing, session length.

use serde::Deserialize;

/// Default seconds between auto-absence ticks.
pub const DEFAULT_ABSENCE_TICK_SECS: u64 = 300;

/// Default session length in minutes. The absence window is start + this + grace period.
pub const DEFAULT_SESSION_DURATION_MINUTES: i64 = 120;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding school.db and reports. Read from SCHOOL_DESK_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Where CSV reports are written. Defaults to `<data_dir>/reports`. Read from SCHOOL_DESK_REPORTS_DIR.
    #[serde(default)]
    pub reports_dir: Option<String>,

    /// Seconds between auto-absence ticks (default 300). Read from SCHOOL_DESK_ABSENCE_TICK_SECS.
    #[serde(default)]
    pub absence_tick_secs: Option<u64>,

    /// Session length in minutes (default 120). Read from SCHOOL_DESK_SESSION_DURATION_MINUTES.
    #[serde(default)]
    pub session_duration_minutes: Option<i64>,

    /// Start the auto-absence scheduler at launch (default true). Read from SCHOOL_DESK_AUTOSTART_SCHEDULER.
    #[serde(default)]
    pub autostart_scheduler: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("SCHOOL_DESK").try_parsing(true));
        if let Ok(path) = std::env::var("SCHOOL_DESK_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn reports_dir_or_default(&self) -> String {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| format!("{}/reports", self.data_dir_or_default()))
    }

    /// Returns tick interval in seconds. Zero is treated as unset.
    pub fn absence_tick_secs_or_default(&self) -> u64 {
        self.absence_tick_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_ABSENCE_TICK_SECS)
    }

    /// Returns session duration in minutes. Non-positive values are treated as unset.
    pub fn session_duration_minutes_or_default(&self) -> i64 {
        self.session_duration_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_SESSION_DURATION_MINUTES)
    }

    pub fn autostart_scheduler_or_default(&self) -> bool {
        self.autostart_scheduler.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset_or_invalid() {
        let cfg = AppConfig {
            absence_tick_secs: Some(0),
            session_duration_minutes: Some(-5),
            ..AppConfig::default()
        };
        assert_eq!(cfg.absence_tick_secs_or_default(), 300);
        assert_eq!(cfg.session_duration_minutes_or_default(), 120);
        assert!(cfg.autostart_scheduler_or_default());
        assert_eq!(cfg.data_dir_or_default(), "./data");
        assert_eq!(cfg.reports_dir_or_default(), "./data/reports");
    }

    #[test]
    fn explicit_values_win() {
        let cfg = AppConfig {
            data_dir: Some("/srv/school".into()),
            absence_tick_secs: Some(60),
            session_duration_minutes: Some(90),
            autostart_scheduler: Some(false),
            ..AppConfig::default()
        };
        assert_eq!(cfg.absence_tick_secs_or_default(), 60);
        assert_eq!(cfg.session_duration_minutes_or_default(), 90);
        assert!(!cfg.autostart_scheduler_or_default());
        assert_eq!(cfg.reports_dir_or_default(), "/srv/school/reports");
    }
}
