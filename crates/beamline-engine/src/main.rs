//! Beamline binary for the RF cavity beam simulation.
//!
//! This is the main entry point that wires together the simulation core,
//! the Prometheus sink, the tick scheduler and the observer API. It loads
//! configuration, initializes all subsystems, and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `beamline-config.yaml` (or `BEAMLINE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Register the Prometheus gauges
//! 4. Build the beam model and the simulation core
//! 5. Start the Observer API server
//! 6. Start the tick scheduler (simulator mode only)
//! 7. Wait for `Ctrl-C`, then shut everything down and log the result

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use beamline_core::beam::BeamModel;
use beamline_core::clock::MonotonicClock;
use beamline_core::config::BeamlineConfig;
use beamline_core::kick::KickGenerator;
use beamline_core::scheduler::{self, SchedulerReport};
use beamline_core::simulation::SimulationCore;
use beamline_core::sink::MetricsSink;
use beamline_observer::metrics::PrometheusSink;
use beamline_observer::state::AppState;
use beamline_types::OperatingMode;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "beamline-config.yaml";

/// Application entry point.
///
/// Initializes all subsystems and serves until interrupted. Returns an
/// error code on failure.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path(std::env::var("BEAMLINE_CONFIG").ok());
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("beamline starting");
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        path = %config_path.display(),
        mode = config.mode.as_str(),
        energy_max_tev = config.beam.energy_max_tev,
        calibration_factor = config.beam.calibration_factor,
        tick_interval_ms = config.scheduler.tick_interval_ms,
        "Configuration loaded"
    );
    if (config.beam.calibration_factor - 1.0).abs() > f64::EPSILON {
        warn!(
            calibration_factor = config.beam.calibration_factor,
            drift_per_tick = config.beam.drift_per_tick(),
            "RF cavity is miscalibrated; the beam will drift"
        );
    }

    // 3. Register the Prometheus gauges.
    let metrics = Arc::new(PrometheusSink::new().map_err(EngineError::from)?);

    // 4. Build the beam model and the simulation core.
    let model = BeamModel::new(config.beam).map_err(EngineError::from)?;
    let sink: Arc<dyn MetricsSink> = Arc::<PrometheusSink>::clone(&metrics);
    let core = Arc::new(SimulationCore::new(
        model,
        config.mode,
        Arc::new(MonotonicClock::new()),
        sink,
    ));
    let kick = KickGenerator::new(&config.recorder);
    let app_state = Arc::new(AppState::new(Arc::clone(&core), metrics, kick));
    info!(mode = core.mode().as_str(), "Simulation core initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 5. Start the Observer API server.
    let observer_handle = beamline_observer::startup::spawn_observer(
        &config.server,
        app_state,
        shutdown_rx.clone(),
    )
    .await
    .map_err(EngineError::from)?;

    // 6. Start the tick scheduler.
    let scheduler_handle = if config.mode == OperatingMode::Simulator {
        let period = Duration::from_millis(config.scheduler.tick_interval_ms);
        Some(tokio::spawn(scheduler::run_scheduler(
            Arc::clone(&core),
            period,
            shutdown_rx,
        )))
    } else {
        info!("Recorder mode, scheduler not started");
        None
    };

    // 7. Wait for Ctrl-C, then shut down.
    tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
    info!("Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        warn!("No task was listening for shutdown");
    }

    let report = match scheduler_handle {
        Some(handle) => Some(handle.await.map_err(|e| EngineError::Task {
            message: format!("scheduler task failed: {e}"),
        })?),
        None => None,
    };
    observer_handle.await.map_err(|e| EngineError::Task {
        message: format!("observer task failed: {e}"),
    })?;

    log_shutdown(report, &core.snapshot().await);
    Ok(())
}

/// Resolve the configuration path from the `BEAMLINE_CONFIG` value.
fn config_path(from_env: Option<String>) -> PathBuf {
    from_env
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
///
/// Environment overrides and validation apply in both cases.
fn load_config(path: &Path) -> Result<BeamlineConfig, EngineError> {
    if path.exists() {
        Ok(BeamlineConfig::from_file(path)?)
    } else {
        let mut config = BeamlineConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Log the final scheduler counters and beam state.
fn log_shutdown(report: Option<SchedulerReport>, snapshot: &beamline_types::BeamSnapshot) {
    if let Some(report) = report {
        info!(
            ticks_ok = report.ticks_ok,
            ticks_failed = report.ticks_failed,
            collapses = report.collapses,
            "Scheduler report"
        );
    }
    info!(
        control_state = ?snapshot.control_state,
        status = snapshot.status,
        energy_tev = snapshot.beam.energy_tev,
        ticks = snapshot.ticks,
        "beamline shutdown complete"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_path_defaults() {
        assert_eq!(config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(
            config_path(Some(String::from("  "))),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
    }

    #[test]
    fn config_path_from_env() {
        assert_eq!(
            config_path(Some(String::from("/etc/beamline.yaml"))),
            PathBuf::from("/etc/beamline.yaml")
        );
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let config = load_config(Path::new("does-not-exist/beamline-config.yaml")).unwrap();
        assert_eq!(config.scheduler.tick_interval_ms, 200);
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
