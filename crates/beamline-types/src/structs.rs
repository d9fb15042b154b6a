//! Core data structs for the Beamline simulation.
//!
//! [`BeamState`] is the physical state of the single global beam. The
//! remaining structs are read-only projections handed to the command
//! interface, plus the observation payload accepted in recorder mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ControlState, OperatingMode};
use crate::ids::RunId;

/// Degrees in a full turn.
const FULL_TURN_DEGREES: f64 = 360.0;

// ---------------------------------------------------------------------------
// Beam state
// ---------------------------------------------------------------------------

/// Physical state of the beam after the most recent tick.
///
/// Internal angles are radians and unbounded. Use
/// [`rf_phase_degrees`](Self::rf_phase_degrees) for external reporting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BeamState {
    /// Wall-clock seconds since the beam was (re)started.
    pub phase_seconds_elapsed: f64,
    /// Phase of the RF field: `elapsed * base_angular_frequency`.
    pub rf_phase_radians: f64,
    /// Accumulated phase misalignment from calibration error.
    pub phase_drift_radians: f64,
    /// `rf_phase_radians + phase_drift_radians`.
    pub effective_phase_radians: f64,
    /// Beam energy in TeV. Within `[0, energy_max_tev]` when simulated; in
    /// recorder mode it is derived from the observed speed instead.
    pub energy_tev: f64,
    /// Particle speed as a percentage of the speed of light, within `[0, 100]`.
    pub speed_percent_c: f64,
    /// Peak energy reachable with the current phase misalignment:
    /// `max(0, energy_max_tev * cos(phase_drift_radians))`.
    pub envelope_energy_tev: f64,
}

impl BeamState {
    /// The RF phase in degrees, normalized to `[0, 360)`.
    pub fn rf_phase_degrees(&self) -> f64 {
        normalize_degrees(self.rf_phase_radians.to_degrees())
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
///
/// `rem_euclid` can round tiny negative inputs up to exactly 360; those
/// fold back to 0. Non-finite input yields 0.
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(FULL_TURN_DEGREES);
    if wrapped >= FULL_TURN_DEGREES {
        0.0
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A consistent, read-only copy of the simulation core.
///
/// Taken under the same lock the tick uses, so every field comes from a
/// single fully-applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BeamSnapshot {
    /// Operating mode of the process.
    pub mode: OperatingMode,
    /// Current control state.
    pub control_state: ControlState,
    /// Integer status code (see [`BeamStatus`](crate::BeamStatus)).
    pub status: i64,
    /// Physical state after the last applied update.
    pub beam: BeamState,
    /// RF phase in degrees, normalized to `[0, 360)`.
    pub rf_phase_degrees: f64,
    /// Ticks applied since the current run started.
    pub ticks: u64,
    /// Identifier of the current or last run.
    pub run_id: Option<RunId>,
    /// Wall-clock start time of the current or last run.
    pub started_at: Option<DateTime<Utc>>,
    /// Last observed particle speed in m/s (recorder mode only).
    pub observed_speed_m_per_s: Option<f64>,
}

impl BeamSnapshot {
    /// The compact state summary served by `GET /state`.
    pub const fn summary(&self) -> StateSummary {
        StateSummary {
            running: self.control_state.is_running(),
            failed: self.control_state.is_failed(),
            speed_percent_c: self.beam.speed_percent_c,
        }
    }
}

/// Compact state summary for polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateSummary {
    /// Whether the beam is circulating.
    pub running: bool,
    /// Whether the beam has collapsed.
    pub failed: bool,
    /// Particle speed as a percentage of c.
    pub speed_percent_c: f64,
}

// ---------------------------------------------------------------------------
// Recorder payloads
// ---------------------------------------------------------------------------

/// A status observation posted by the external status feed.
///
/// `speed` is the particle speed in m/s as measured by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusObservation {
    /// Integer status code (0..=4).
    pub status: i64,
    /// Particle speed in m/s.
    pub speed: f64,
}

/// A single kick-power draw served to the browser client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KickPower {
    /// Kick impulse. The client adds `kick_power / 50` to its angular speed
    /// and treats a draw of 50 or more as an overload.
    pub kick_power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn degrees_wrap_into_range() {
        assert!(close(normalize_degrees(370.0), 10.0));
        assert!(close(normalize_degrees(-90.0), 270.0));
        assert!(close(normalize_degrees(720.0), 0.0));
        assert!(close(normalize_degrees(f64::NAN), 0.0));
    }

    #[test]
    fn tiny_negative_angle_never_reports_full_turn() {
        let wrapped = normalize_degrees(-1e-20);
        assert!((0.0..FULL_TURN_DEGREES).contains(&wrapped));
    }

    #[test]
    fn rf_phase_degrees_uses_rf_phase() {
        let state = BeamState {
            rf_phase_radians: std::f64::consts::PI * 3.0,
            ..BeamState::default()
        };
        assert!(close(state.rf_phase_degrees(), 180.0));
    }

    #[test]
    fn summary_reflects_control_state() {
        let snapshot = BeamSnapshot {
            mode: OperatingMode::Simulator,
            control_state: ControlState::Failed,
            status: 3,
            beam: BeamState {
                speed_percent_c: 12.5,
                ..BeamState::default()
            },
            rf_phase_degrees: 0.0,
            ticks: 4,
            run_id: None,
            started_at: None,
            observed_speed_m_per_s: None,
        };
        let summary = snapshot.summary();
        assert!(!summary.running);
        assert!(summary.failed);
        assert!(close(summary.speed_percent_c, 12.5));
    }

    #[test]
    fn observation_parses_from_client_json() {
        let parsed: Result<StatusObservation, _> =
            serde_json::from_str(r#"{"status": 1, "speed": 250}"#);
        assert!(parsed.is_ok_and(|obs| obs.status == 1 && close(obs.speed, 250.0)));
    }
}
