//! Beam model: the transition function from one tick's physical state to
//! the next.
//!
//! The model is a pure function of `(elapsed, calibration_factor,
//! previous_drift)`. The RF phase is recomputed from the elapsed time on
//! every call, while the phase drift is *integrated*: each call adds
//! `(calibration_factor - 1.0) * drift_rate` to the previous drift. Total
//! drift therefore depends on how many ticks have run, not only on the
//! elapsed time.
//!
//! ```text
//! rf_phase        = elapsed * ω
//! drift'          = drift + (k - 1) * drift_rate
//! effective_phase = rf_phase + drift'
//! energy          = max(0, E_max * cos(effective_phase))
//! speed_%c        = max(0, energy / E_max * 100)
//! envelope        = max(0, E_max * cos(drift'))
//! ```

use beamline_types::BeamState;

use crate::config::{BeamConfig, CollapseCriterion};

/// Errors produced by a single beam-model step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BeamError {
    /// Elapsed time was negative or not a number.
    #[error("elapsed time must be finite and non-negative, got {elapsed}")]
    InvalidElapsed {
        /// The rejected elapsed time in seconds.
        elapsed: f64,
    },

    /// A derived quantity came out non-finite.
    #[error("{quantity} is not finite")]
    NonFinite {
        /// Name of the offending quantity.
        quantity: &'static str,
    },

    /// The model parameters are invalid.
    #[error("invalid beam parameters: {reason}")]
    InvalidParameters {
        /// What is wrong with the parameters.
        reason: String,
    },
}

/// The beam model with its validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamModel {
    params: BeamConfig,
}

impl BeamModel {
    /// Build a model from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BeamError::InvalidParameters`] if the parameters fail
    /// validation.
    pub fn new(params: BeamConfig) -> Result<Self, BeamError> {
        params
            .validate()
            .map_err(|err| BeamError::InvalidParameters {
                reason: err.to_string(),
            })?;
        Ok(Self { params })
    }

    /// The model parameters.
    pub const fn params(&self) -> &BeamConfig {
        &self.params
    }

    /// The state a beam is reset to when it (re)starts: zero elapsed time,
    /// zero drift, and the values a zero phase implies.
    pub fn rest_state(&self) -> BeamState {
        let energy_max = self.params.energy_max_tev;
        BeamState {
            phase_seconds_elapsed: 0.0,
            rf_phase_radians: 0.0,
            phase_drift_radians: 0.0,
            effective_phase_radians: 0.0,
            energy_tev: energy_max,
            speed_percent_c: 100.0,
            envelope_energy_tev: energy_max,
        }
    }

    /// Compute the next state from the previous one and the time elapsed
    /// since the run started.
    ///
    /// The previous state is never modified; on error the caller keeps it.
    ///
    /// # Errors
    ///
    /// Returns [`BeamError::InvalidElapsed`] for a negative or non-finite
    /// `elapsed`, and [`BeamError::NonFinite`] if any derived value
    /// overflows.
    pub fn advance(&self, previous: &BeamState, elapsed: f64) -> Result<BeamState, BeamError> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(BeamError::InvalidElapsed { elapsed });
        }

        let rf_phase = finite("rf_phase_radians", elapsed * self.params.base_angular_frequency)?;
        let drift = finite(
            "phase_drift_radians",
            previous.phase_drift_radians + self.params.drift_per_tick(),
        )?;
        let effective_phase = finite("effective_phase_radians", rf_phase + drift)?;

        let energy = self.clamped_energy(effective_phase.cos());
        let speed = (energy / self.params.energy_max_tev * 100.0).clamp(0.0, 100.0);
        let envelope = self.clamped_energy(drift.cos());

        Ok(BeamState {
            phase_seconds_elapsed: elapsed,
            rf_phase_radians: rf_phase,
            phase_drift_radians: drift,
            effective_phase_radians: effective_phase,
            energy_tev: energy,
            speed_percent_c: speed,
            envelope_energy_tev: envelope,
        })
    }

    /// The energy reading compared against the collapse threshold.
    pub const fn collapse_energy(&self, state: &BeamState) -> f64 {
        match self.params.collapse_criterion {
            CollapseCriterion::Envelope => state.envelope_energy_tev,
            CollapseCriterion::Instantaneous => state.energy_tev,
        }
    }

    /// `E_max * alignment`, clamped to `[0, E_max]`.
    fn clamped_energy(&self, alignment: f64) -> f64 {
        let energy_max = self.params.energy_max_tev;
        (energy_max * alignment).clamp(0.0, energy_max)
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, BeamError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BeamError::NonFinite { quantity })
    }
}
