//! Fixed-cadence driver for [`SimulationCore::tick`].
//!
//! The scheduler runs for the lifetime of the process whether or not the
//! beam is running; an idle tick is cheap. A failed tick is logged and
//! skipped and never ends the loop. The loop exits only when the shutdown
//! signal flips (or its sender is dropped).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::MIN_TICK_INTERVAL_MS;
use crate::simulation::{SimulationCore, TickOutcome};

/// Counters accumulated over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Ticks that completed, including idle ones.
    pub ticks_ok: u64,
    /// Ticks that returned an error and were skipped.
    pub ticks_failed: u64,
    /// Ticks on which the beam collapsed.
    pub collapses: u64,
}

/// Drive `core` every `period` until `shutdown` reads `true`.
///
/// Missed ticks are delayed, not bursted. Periods shorter than
/// [`MIN_TICK_INTERVAL_MS`] are raised to it.
pub async fn run_scheduler(
    core: Arc<SimulationCore>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerReport {
    let period = period.max(Duration::from_millis(MIN_TICK_INTERVAL_MS));
    let mut report = SchedulerReport::default();

    if *shutdown.borrow() {
        return report;
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        mode = core.mode().as_str(),
        "Scheduler starting"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match core.tick().await {
                    Ok(TickOutcome::Collapsed { .. }) => {
                        report.ticks_ok = report.ticks_ok.saturating_add(1);
                        report.collapses = report.collapses.saturating_add(1);
                    }
                    Ok(_) => {
                        report.ticks_ok = report.ticks_ok.saturating_add(1);
                    }
                    Err(err) => {
                        report.ticks_failed = report.ticks_failed.saturating_add(1);
                        warn!(error = %err, failed = report.ticks_failed, "Tick failed, skipping");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(
        ticks_ok = report.ticks_ok,
        ticks_failed = report.ticks_failed,
        collapses = report.collapses,
        "Scheduler stopped"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beamline_types::{ControlState, OperatingMode};

    use super::*;
    use crate::beam::BeamModel;
    use crate::clock::ManualClock;
    use crate::config::BeamConfig;
    use crate::sink::RecordingSink;

    fn core(config: BeamConfig, mode: OperatingMode) -> Arc<SimulationCore> {
        Arc::new(SimulationCore::new(
            BeamModel::new(config).unwrap(),
            mode,
            Arc::new(ManualClock::new()),
            Arc::new(RecordingSink::new()),
        ))
    }

    async fn run_for(core: Arc<SimulationCore>, millis: u64) -> SchedulerReport {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduler(core, Duration::from_millis(200), rx));
        tokio::time::sleep(Duration::from_millis(millis)).await;
        tx.send(true).unwrap();
        handle.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_at_fixed_cadence_while_stopped() {
        let core = core(BeamConfig::default(), OperatingMode::Simulator);
        // First tick fires immediately, then every 200 ms.
        let report = run_for(core.clone(), 1_010).await;
        assert_eq!(report.ticks_ok, 6);
        assert_eq!(report.ticks_failed, 0);
        assert_eq!(core.snapshot().await.ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn advances_running_beam() {
        let core = core(BeamConfig::default(), OperatingMode::Simulator);
        let _ = core.request_start().await.unwrap();
        let report = run_for(core.clone(), 1_010).await;
        assert_eq!(report.ticks_ok, 6);
        assert_eq!(core.snapshot().await.ticks, 6);
        assert_eq!(core.snapshot().await.control_state, ControlState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ticks_do_not_stop_the_loop() {
        // Drift overflows to infinity on the second step.
        let config = BeamConfig {
            calibration_factor: 0.0,
            drift_rate: f64::MAX,
            collapse_threshold_tev: 0.0,
            ..BeamConfig::default()
        };
        let core = core(config, OperatingMode::Simulator);
        let _ = core.request_start().await.unwrap();
        let report = run_for(core.clone(), 1_010).await;
        assert_eq!(report.ticks_ok, 1);
        assert_eq!(report.ticks_failed, 5);

        // The last good state is kept.
        let snapshot = core.snapshot().await;
        assert_eq!(snapshot.ticks, 1);
        assert!(snapshot.beam.phase_drift_radians.is_finite());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_returns_immediately() {
        let core = core(BeamConfig::default(), OperatingMode::Simulator);
        let (_tx, rx) = watch::channel(true);
        let report = run_scheduler(core, Duration::from_millis(200), rx).await;
        assert_eq!(report, SchedulerReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_stops_the_loop() {
        let core = core(BeamConfig::default(), OperatingMode::Simulator);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_scheduler(core, Duration::from_millis(200), rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);
        let report = handle.await.unwrap();
        assert_eq!(report.ticks_ok, 1);
    }
}
