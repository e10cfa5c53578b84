//! Auto-absence scheduler: owns the background tick loop that drives the absence processor.
//!
//! One instance is built at startup and shared by Arc. `start` spawns the loop at most
//! once; `stop` signals it to exit at its next wait, so a run in progress always finishes.
//! Each tick awaits the processor before sleeping again: runs never overlap, and a slow
//! run simply pushes the next tick back.

use crate::domain::DomainError;
use crate::ports::Clock;
use crate::usecases::absence_processor::{AbsenceProcessor, ProcessReport};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

struct RunningTimer {
    handle: JoinHandle<()>,
    stop_tx: oneshot::Sender<()>,
}

impl RunningTimer {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

pub struct AbsenceScheduler {
    processor: Arc<AbsenceProcessor>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    timer: Mutex<Option<RunningTimer>>,
}

impl AbsenceScheduler {
    pub fn new(processor: Arc<AbsenceProcessor>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            processor,
            clock,
            interval,
            timer: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn timer(&self) -> MutexGuard<'_, Option<RunningTimer>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the tick loop. Returns false (and spawns nothing) if it is already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut timer = self.timer();
        if timer.as_ref().is_some_and(RunningTimer::is_alive) {
            debug!("absence scheduler already running");
            return false;
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.processor),
            Arc::clone(&self.clock),
            self.interval,
            stop_rx,
        ));
        *timer = Some(RunningTimer { handle, stop_tx });
        info!(
            interval_secs = self.interval.as_secs(),
            "absence scheduler started"
        );
        true
    }

    /// Signal the loop to exit. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let Some(running) = self.timer().take() else {
            return false;
        };
        let was_alive = running.is_alive();
        // A dropped receiver means the loop already exited; nothing to signal.
        let _ = running.stop_tx.send(());
        info!("absence scheduler stop requested");
        was_alive
    }

    pub fn is_running(&self) -> bool {
        self.timer().as_ref().is_some_and(RunningTimer::is_alive)
    }

    /// Run the processor now, independent of the timer. Shares the processor's in-flight
    /// gate, so it returns a skipped report while a scheduled run is in progress.
    pub async fn run_once(&self) -> Result<ProcessReport, DomainError> {
        let now = self.clock.now();
        info!(now = %now, "manual absence run");
        self.processor.process(now).await
    }
}

impl Drop for AbsenceScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.timer().take() {
            let _ = running.stop_tx.send(());
        }
    }
}

async fn tick_loop(
    processor: Arc<AbsenceProcessor>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = tokio::time::sleep(interval) => {}
        }
        match processor.process(clock.now()).await {
            Ok(report) if report.skipped => debug!("tick skipped: a run is already in flight"),
            Ok(report) => debug!(
                scanned = report.scanned_sessions,
                marked = report.marked_absent,
                "scheduled absence run finished"
            ),
            Err(e) => error!(error = %e, "scheduled absence run failed"),
        }
    }
    info!("absence scheduler stopped");
}
