//! The simulation core: the single shared beam and everything that may
//! touch it.
//!
//! One [`SimulationCore`] exists per process. The scheduler calls
//! [`tick`](SimulationCore::tick), HTTP handlers call the command,
//! observation and snapshot methods. All of them go through one async
//! mutex. Every mutation publishes its gauges to the metrics sink as one
//! [`MetricsSink::publish`] batch before the lock is released, so a sink
//! that applies batches atomically never exposes values from two ticks.

use std::sync::Arc;
use std::time::Duration;

use beamline_types::{
    BeamSnapshot, BeamState, BeamStatus, ControlState, OperatingMode, RunId, StartOutcome,
    StatusObservation, StopOutcome,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::beam::{BeamError, BeamModel};
use crate::clock::Clock;
use crate::control::ControlMachine;
use crate::relativity;
use crate::sink::{Gauge, MetricsSink};

/// A tick that could not be applied. The previous state is kept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    /// The beam model rejected the step.
    #[error("beam model error: {source}")]
    Beam {
        /// The underlying model error.
        #[from]
        source: BeamError,
    },
}

/// A start or stop command that does not apply in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Commands are only accepted by the simulator.
    #[error("beam commands are not accepted in {} mode", .mode.as_str())]
    WrongMode {
        /// The mode the core is running in.
        mode: OperatingMode,
    },
}

/// A rejected status observation. Nothing was mutated.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ObservationError {
    /// Observations are only accepted by the recorder.
    #[error("status observations are not accepted in {} mode", .mode.as_str())]
    WrongMode {
        /// The mode the core is running in.
        mode: OperatingMode,
    },

    /// The status code is not one of the known codes.
    #[error("unknown status code {status}")]
    UnknownStatus {
        /// The rejected code.
        status: i64,
    },

    /// The speed is negative or not a number.
    #[error("speed must be finite and non-negative, got {speed}")]
    InvalidSpeed {
        /// The rejected speed.
        speed: f64,
    },
}

/// What a single call to [`SimulationCore::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The beam is not running (or the core is recording); nothing moved.
    Idle,
    /// The beam advanced one step.
    Advanced {
        /// Instantaneous energy after the step.
        energy_tev: f64,
    },
    /// The beam advanced and collapsed on this step.
    Collapsed {
        /// The energy reading that fell below the threshold.
        energy_tev: f64,
    },
}

/// State guarded by the core's mutex.
#[derive(Debug)]
struct CoreState {
    machine: ControlMachine,
    beam: BeamState,
    /// Clock reading when the current run started.
    run_origin: Duration,
    run_id: Option<RunId>,
    started_at: Option<DateTime<Utc>>,
    /// Steps applied in the current run (observations, in recorder mode).
    ticks: u64,
    /// Last status reported by the external feed (recorder only).
    observed_status: Option<BeamStatus>,
    observed_speed: Option<f64>,
}

impl CoreState {
    fn status(&self) -> BeamStatus {
        self.observed_status
            .unwrap_or_else(|| self.machine.state().status())
    }

    /// Record the start of a new run.
    fn begin_run(&mut self, origin: Duration) -> RunId {
        let run_id = RunId::new();
        self.run_origin = origin;
        self.run_id = Some(run_id);
        self.started_at = Some(Utc::now());
        self.ticks = 0;
        run_id
    }
}

/// The shared beam, its control state, and the collaborators it publishes
/// through.
pub struct SimulationCore {
    model: BeamModel,
    mode: OperatingMode,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn MetricsSink>,
    inner: Mutex<CoreState>,
}

impl std::fmt::Debug for SimulationCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationCore")
            .field("model", &self.model)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl SimulationCore {
    /// Create a stopped core and publish its initial gauges.
    pub fn new(
        model: BeamModel,
        mode: OperatingMode,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let state = CoreState {
            machine: ControlMachine::new(),
            beam: BeamState::default(),
            run_origin: clock.now(),
            run_id: None,
            started_at: None,
            ticks: 0,
            observed_status: None,
            observed_speed: None,
        };
        let core = Self {
            model,
            mode,
            clock,
            sink,
            inner: Mutex::new(state),
        };
        core.publish_initial();
        core
    }

    /// The operating mode fixed at startup.
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// The beam model in use.
    pub const fn model(&self) -> &BeamModel {
        &self.model
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the beam by one step if it is running.
    ///
    /// Reads the clock, computes the next state, evaluates collapse and
    /// publishes, all under the lock. On error the previous state is kept
    /// and nothing is published.
    pub async fn tick(&self) -> Result<TickOutcome, TickError> {
        if self.mode != OperatingMode::Simulator {
            return Ok(TickOutcome::Idle);
        }

        let mut inner = self.inner.lock().await;
        if !inner.machine.state().is_running() {
            return Ok(TickOutcome::Idle);
        }

        let elapsed = self
            .clock
            .now()
            .saturating_sub(inner.run_origin)
            .as_secs_f64();
        let next = self.model.advance(&inner.beam, elapsed)?;
        inner.beam = next;
        inner.ticks = inner.ticks.saturating_add(1);

        let threshold_tev = self.model.params().collapse_threshold_tev;
        let collapse_energy = self.model.collapse_energy(&next);
        let collapsed = inner
            .machine
            .evaluate_collapse(collapse_energy, threshold_tev);
        self.publish_beam(&inner);

        if collapsed {
            warn!(
                run_id = ?inner.run_id,
                tick = inner.ticks,
                elapsed,
                drift = next.phase_drift_radians,
                energy_tev = collapse_energy,
                threshold_tev,
                "Beam collapsed"
            );
            Ok(TickOutcome::Collapsed {
                energy_tev: collapse_energy,
            })
        } else {
            debug!(
                tick = inner.ticks,
                elapsed,
                energy_tev = next.energy_tev,
                speed_percent_c = next.speed_percent_c,
                "Tick"
            );
            Ok(TickOutcome::Advanced {
                energy_tev: next.energy_tev,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Handle a start command.
    ///
    /// An accepted start resets the beam to rest, restarts the run clock
    /// and assigns a fresh [`RunId`].
    pub async fn request_start(&self) -> Result<StartOutcome, CommandError> {
        self.require_mode(OperatingMode::Simulator)?;

        let mut inner = self.inner.lock().await;
        let outcome = inner.machine.request_start();
        if outcome == StartOutcome::Started {
            inner.beam = self.model.rest_state();
            let run_id = inner.begin_run(self.clock.now());
            info!(%run_id, "Beam started");
        } else {
            debug!(outcome = outcome.as_str(), "Start ignored");
        }
        self.publish_beam(&inner);
        Ok(outcome)
    }

    /// Handle a stop command. The beam keeps its last values.
    pub async fn request_stop(&self) -> Result<StopOutcome, CommandError> {
        self.require_mode(OperatingMode::Simulator)?;

        let mut inner = self.inner.lock().await;
        let outcome = inner.machine.request_stop();
        if outcome == StopOutcome::Stopped {
            info!(run_id = ?inner.run_id, ticks = inner.ticks, "Beam stopped");
        }
        self.publish_beam(&inner);
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Recorder
    // -----------------------------------------------------------------------

    /// Apply a status report from the external feed.
    ///
    /// The feed is authoritative: it may move the beam out of `Failed`.
    /// Energy and percent-of-c are derived from the observed speed; the
    /// tick formula never runs.
    pub async fn observe(
        &self,
        observation: StatusObservation,
    ) -> Result<StatusObservation, ObservationError> {
        if self.mode != OperatingMode::Recorder {
            return Err(ObservationError::WrongMode { mode: self.mode });
        }
        let status = BeamStatus::from_code(observation.status).ok_or(
            ObservationError::UnknownStatus {
                status: observation.status,
            },
        )?;
        let speed = observation.speed;
        if !speed.is_finite() || speed < 0.0 {
            return Err(ObservationError::InvalidSpeed { speed });
        }

        let mut inner = self.inner.lock().await;
        let previous = inner.machine.state();
        let next = status.control_state();
        inner.machine.force(next);
        inner.observed_status = Some(status);
        inner.observed_speed = Some(speed);
        inner.beam.energy_tev = relativity::energy_from_speed(speed);
        inner.beam.speed_percent_c = relativity::percent_c(speed);

        if next == ControlState::Running && previous != ControlState::Running {
            let run_id = inner.begin_run(self.clock.now());
            info!(%run_id, "Recorded beam started");
        } else if next != previous {
            info!(from = ?previous, to = ?next, status = status.code(), "Recorded state change");
        }
        inner.ticks = inner.ticks.saturating_add(1);

        self.sink.publish(&[
            (Gauge::BeamStatus, code_value(status)),
            (Gauge::ParticleSpeed, speed),
            (Gauge::BeamEnergyTev, inner.beam.energy_tev),
            (Gauge::ParticleSpeedPercentC, inner.beam.speed_percent_c),
        ]);

        Ok(observation)
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// A consistent copy of the current state. No side effects.
    pub async fn snapshot(&self) -> BeamSnapshot {
        let inner = self.inner.lock().await;
        BeamSnapshot {
            mode: self.mode,
            control_state: inner.machine.state(),
            status: inner.status().code(),
            beam: inner.beam,
            rf_phase_degrees: inner.beam.rf_phase_degrees(),
            ticks: inner.ticks,
            run_id: inner.run_id,
            started_at: inner.started_at,
            observed_speed_m_per_s: inner.observed_speed,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_mode(&self, mode: OperatingMode) -> Result<(), CommandError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(CommandError::WrongMode { mode: self.mode })
        }
    }

    fn publish_initial(&self) {
        let mode_gauges: &[Gauge] = if self.mode == OperatingMode::Simulator {
            &[Gauge::RfCavityPhaseAngle, Gauge::RfPhaseDriftRadians]
        } else {
            &[Gauge::ParticleSpeed]
        };
        let mut values = vec![
            (Gauge::BeamStatus, code_value(BeamStatus::Stopped)),
            (Gauge::BeamEnergyTev, 0.0),
            (Gauge::ParticleSpeedPercentC, 0.0),
        ];
        values.extend(mode_gauges.iter().map(|&gauge| (gauge, 0.0)));
        self.sink.publish(&values);
    }

    fn publish_beam(&self, inner: &CoreState) {
        let beam = &inner.beam;
        self.sink.publish(&[
            (Gauge::BeamEnergyTev, beam.energy_tev),
            (Gauge::ParticleSpeedPercentC, beam.speed_percent_c),
            (Gauge::RfCavityPhaseAngle, beam.rf_phase_degrees()),
            (Gauge::RfPhaseDriftRadians, beam.phase_drift_radians),
            (Gauge::BeamStatus, code_value(inner.status())),
        ]);
    }
}

/// Status codes are tiny, so the conversion is exact.
const fn code_value(status: BeamStatus) -> f64 {
    match status {
        BeamStatus::Stopped => 0.0,
        BeamStatus::Running => 1.0,
        BeamStatus::Success => 2.0,
        BeamStatus::Overloaded => 3.0,
        BeamStatus::Timeout => 4.0,
    }
}
