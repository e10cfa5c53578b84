//! Grace-period setting: validated read-through / write-through over SettingsPort.

use crate::domain::{DomainError, GracePeriod};
use crate::ports::SettingsPort;
use std::sync::Arc;
use tracing::info;

/// Store for the absence grace period. Holds no cache; every read hits the backing store.
pub struct GracePeriodStore {
    settings: Arc<dyn SettingsPort>,
}

impl GracePeriodStore {
    pub fn new(settings: Arc<dyn SettingsPort>) -> Self {
        Self { settings }
    }

    /// Current grace period. A stored value outside 5..=60 is reported as a persistence error.
    pub async fn get(&self) -> Result<GracePeriod, DomainError> {
        let minutes = self.settings.grace_period_minutes().await?;
        GracePeriod::new(minutes).map_err(|_| {
            DomainError::Persistence(format!("stored grace period {} is out of range", minutes))
        })
    }

    /// Validate and persist. Out-of-range values are rejected without touching the store.
    pub async fn set(&self, minutes: u32) -> Result<GracePeriod, DomainError> {
        let grace = GracePeriod::new(minutes)?;
        self.settings.set_grace_period_minutes(grace.minutes()).await?;
        info!(minutes, "grace period updated");
        Ok(grace)
    }
}
