//! Metrics sink: the named gauges the core publishes into.
//!
//! The core only knows the [`MetricsSink`] capability. The exposition
//! format lives elsewhere (the observer crate implements the sink on top
//! of a Prometheus registry), which keeps the simulation decoupled from
//! how values are scraped.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Every gauge the core publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gauge {
    /// Current beam energy in TeV.
    BeamEnergyTev,
    /// Particle speed as a percentage of c.
    ParticleSpeedPercentC,
    /// RF cavity phase angle in degrees, `[0, 360)`.
    RfCavityPhaseAngle,
    /// Accumulated phase drift in radians.
    RfPhaseDriftRadians,
    /// Integer status code (0 stopped .. 4 timeout).
    BeamStatus,
    /// Observed particle speed in m/s (recorder mode).
    ParticleSpeed,
}

impl Gauge {
    /// All gauges, in exposition order.
    pub const ALL: [Self; 6] = [
        Self::BeamEnergyTev,
        Self::ParticleSpeedPercentC,
        Self::RfCavityPhaseAngle,
        Self::RfPhaseDriftRadians,
        Self::BeamStatus,
        Self::ParticleSpeed,
    ];

    /// The exposed metric name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeamEnergyTev => "beam_energy_tev",
            Self::ParticleSpeedPercentC => "particle_speed_percent_c",
            Self::RfCavityPhaseAngle => "rf_cavity_phase_angle",
            Self::RfPhaseDriftRadians => "rf_phase_drift_radians",
            Self::BeamStatus => "beam_status",
            Self::ParticleSpeed => "particle_speed",
        }
    }

    /// Help text published alongside the metric.
    pub const fn help(self) -> &'static str {
        match self {
            Self::BeamEnergyTev => "Current beam energy in TeV",
            Self::ParticleSpeedPercentC => "Particle speed as % of light speed",
            Self::RfCavityPhaseAngle => "RF cavity phase angle (degrees)",
            Self::RfPhaseDriftRadians => "Accumulated RF phase drift (radians)",
            Self::BeamStatus => {
                "Beam status (0 stopped, 1 running, 2 success, 3 overloaded, 4 timeout)"
            }
            Self::ParticleSpeed => "Observed particle speed (m/s)",
        }
    }
}

/// A write-only set of named gauges.
///
/// Implementations must tolerate concurrent writers and readers. Writes
/// cannot fail from the core's point of view; a sink that loses a value
/// should log it, since the next tick republishes everything.
pub trait MetricsSink: Send + Sync {
    /// Publish the latest value of a gauge.
    fn set(&self, gauge: Gauge, value: f64);

    /// Publish several gauges as one update.
    ///
    /// A reader must see either none or all of `values`. The default
    /// writes them one at a time and is only suitable for sinks with no
    /// concurrent readers.
    fn publish(&self, values: &[(Gauge, f64)]) {
        for &(gauge, value) in values {
            self.set(gauge, value);
        }
    }
}

/// A sink that remembers the last value of every gauge.
///
/// Used in tests and anywhere the published values need to be read back
/// without an exposition format.
#[derive(Debug, Default)]
pub struct RecordingSink {
    values: Mutex<BTreeMap<Gauge, f64>>,
    writes: Mutex<u64>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last value written to `gauge`, if any.
    pub fn get(&self, gauge: Gauge) -> Option<f64> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(&gauge).copied())
    }

    /// Total number of `set` calls received.
    pub fn writes(&self) -> u64 {
        self.writes.lock().map_or(0, |count| *count)
    }
}

impl MetricsSink for RecordingSink {
    fn set(&self, gauge: Gauge, value: f64) {
        self.publish(&[(gauge, value)]);
    }

    fn publish(&self, batch: &[(Gauge, f64)]) {
        if let Ok(mut values) = self.values.lock() {
            values.extend(batch.iter().copied());
        }
        if let Ok(mut count) = self.writes.lock() {
            let len = u64::try_from(batch.len()).unwrap_or(u64::MAX);
            *count = count.saturating_add(len);
        }
    }
}
