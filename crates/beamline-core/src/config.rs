//! Configuration loading and typed config structures for Beamline.
//!
//! The canonical configuration lives in `beamline-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror the
//! YAML structure, a loader that reads the file, and validation of the
//! physical parameters before the simulation core is built.
//!
//! Every field has a default matching the reference accelerator: a 6.8 TeV
//! beam, a 0.5 Hz RF field, a deliberately miscalibrated cavity (0.8) and a
//! 200 ms tick.

use std::path::Path;

use beamline_types::OperatingMode;
use serde::Deserialize;

/// Smallest accepted scheduler interval in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible setup.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Beamline configuration.
///
/// Mirrors the structure of `beamline-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BeamlineConfig {
    /// Physical parameters of the simulated beam.
    #[serde(default)]
    pub beam: BeamConfig,

    /// Tick cadence.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Whether the core simulates or records.
    #[serde(default)]
    pub mode: OperatingMode,

    /// Recorder-mode settings.
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BeamlineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `BEAMLINE_PORT` overrides `server.port`
    /// - `BEAMLINE_MODE` overrides `mode`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// No environment overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Override values with process environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override values using the given variable lookup.
    ///
    /// Unparseable values are ignored with a warning so a typo in the
    /// environment never prevents startup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BEAMLINE_PORT") {
            match val.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(err) => tracing::warn!(value = %val, %err, "Ignoring invalid BEAMLINE_PORT"),
            }
        }
        if let Some(val) = lookup("BEAMLINE_MODE") {
            match OperatingMode::parse(&val) {
                Some(mode) => self.mode = mode,
                None => tracing::warn!(value = %val, "Ignoring unknown BEAMLINE_MODE"),
            }
        }
    }

    /// Check that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.beam.validate()?;
        if self.scheduler.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(invalid(format!(
                "scheduler.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )));
        }
        self.recorder.validate()
    }
}

/// Physical parameters of the beam model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BeamConfig {
    /// Peak beam energy in TeV.
    #[serde(default = "default_energy_max_tev")]
    pub energy_max_tev: f64,

    /// Angular frequency of the RF field in rad/s (`2π · f`).
    #[serde(default = "default_base_angular_frequency")]
    pub base_angular_frequency: f64,

    /// Cavity calibration. 1.0 is perfectly tuned; anything else drifts.
    #[serde(default = "default_calibration_factor")]
    pub calibration_factor: f64,

    /// Drift added per tick per unit of calibration error, in radians.
    #[serde(default = "default_drift_rate")]
    pub drift_rate: f64,

    /// Energy in TeV below which a running beam collapses.
    #[serde(default = "default_collapse_threshold_tev")]
    pub collapse_threshold_tev: f64,

    /// Which energy is compared against the collapse threshold.
    #[serde(default)]
    pub collapse_criterion: CollapseCriterion,
}

/// Which energy reading decides a collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseCriterion {
    /// Compare the drift envelope `E_max * cos(drift)`. A perfectly
    /// calibrated beam never collapses.
    #[default]
    Envelope,
    /// Compare the instantaneous energy. The energy is clamped to zero for
    /// half of every RF period, so any beam collapses within its first period.
    Instantaneous,
}

impl BeamConfig {
    /// Drift added to the phase on every tick.
    pub const fn drift_per_tick(&self) -> f64 {
        (self.calibration_factor - 1.0) * self.drift_rate
    }

    /// Validate the physical parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.energy_max_tev.is_finite() && self.energy_max_tev > 0.0) {
            return Err(invalid("beam.energy_max_tev must be a positive number"));
        }
        if !(self.base_angular_frequency.is_finite() && self.base_angular_frequency > 0.0) {
            return Err(invalid("beam.base_angular_frequency must be a positive number"));
        }
        if !self.calibration_factor.is_finite() {
            return Err(invalid("beam.calibration_factor must be finite"));
        }
        if !(self.drift_rate.is_finite() && self.drift_rate >= 0.0) {
            return Err(invalid("beam.drift_rate must be a non-negative number"));
        }
        if !(self.collapse_threshold_tev.is_finite()
            && self.collapse_threshold_tev >= 0.0
            && self.collapse_threshold_tev < self.energy_max_tev)
        {
            return Err(invalid(
                "beam.collapse_threshold_tev must lie in [0, energy_max_tev)",
            ));
        }
        Ok(())
    }
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            energy_max_tev: default_energy_max_tev(),
            base_angular_frequency: default_base_angular_frequency(),
            calibration_factor: default_calibration_factor(),
            drift_rate: default_drift_rate(),
            collapse_threshold_tev: default_collapse_threshold_tev(),
            collapse_criterion: CollapseCriterion::default(),
        }
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Recorder-mode settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RecorderConfig {
    /// Lower bound of a kick-power draw.
    #[serde(default = "default_kick_power_min")]
    pub kick_power_min: f64,

    /// Upper bound of a kick-power draw (inclusive).
    #[serde(default = "default_kick_power_max")]
    pub kick_power_max: f64,

    /// Seed for the kick-power generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl RecorderConfig {
    /// Validate the kick-power range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the range is empty or not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.kick_power_min.is_finite()
            && self.kick_power_max.is_finite()
            && self.kick_power_min >= 0.0
            && self.kick_power_min <= self.kick_power_max)
        {
            return Err(invalid(
                "recorder.kick_power_min must be non-negative and not above kick_power_max",
            ));
        }
        Ok(())
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            kick_power_min: default_kick_power_min(),
            kick_power_max: default_kick_power_max(),
            seed: default_seed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

const fn default_energy_max_tev() -> f64 {
    6.8
}

const fn default_base_angular_frequency() -> f64 {
    // 2π · 0.5 Hz
    std::f64::consts::PI
}

const fn default_calibration_factor() -> f64 {
    0.8
}

const fn default_drift_rate() -> f64 {
    0.02
}

const fn default_collapse_threshold_tev() -> f64 {
    0.05
}

const fn default_tick_interval_ms() -> u64 {
    200
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

const fn default_kick_power_min() -> f64 {
    5.0
}

const fn default_kick_power_max() -> f64 {
    15.0
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn default_config_is_valid() {
        let config = BeamlineConfig::default();
        assert!(config.validate().is_ok());
        assert!(close(config.beam.energy_max_tev, 6.8));
        assert!(close(config.beam.base_angular_frequency, std::f64::consts::PI));
        assert!(close(config.beam.calibration_factor, 0.8));
        assert_eq!(config.scheduler.tick_interval_ms, 200);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.mode, OperatingMode::Simulator);
        assert_eq!(config.beam.collapse_criterion, CollapseCriterion::Envelope);
    }

    #[test]
    fn default_drift_per_tick_is_negative() {
        let beam = BeamConfig::default();
        assert!(close(beam.drift_per_tick(), -0.004));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
beam:
  energy_max_tev: 7.0
  base_angular_frequency: 6.283185307179586
  calibration_factor: 1.0
  drift_rate: 0.01
  collapse_threshold_tev: 0.1
  collapse_criterion: instantaneous

scheduler:
  tick_interval_ms: 50

server:
  host: "127.0.0.1"
  port: 9090

mode: recorder

recorder:
  kick_power_min: 1.0
  kick_power_max: 2.0
  seed: 7

logging:
  level: "debug"
"#;

        let config = BeamlineConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert!(close(config.beam.energy_max_tev, 7.0));
        assert!(close(config.beam.calibration_factor, 1.0));
        assert!(close(config.beam.drift_per_tick(), 0.0));
        assert_eq!(config.beam.collapse_criterion, CollapseCriterion::Instantaneous);
        assert_eq!(config.scheduler.tick_interval_ms, 50);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.mode, OperatingMode::Recorder);
        assert_eq!(config.recorder.seed, 7);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "beam:\n  calibration_factor: 0.9\n";
        let config = BeamlineConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert!(close(config.beam.calibration_factor, 0.9));
        // Everything else uses defaults
        assert!(close(config.beam.drift_rate, 0.02));
        assert_eq!(config.scheduler.tick_interval_ms, 200);
    }

    #[test]
    fn rejects_threshold_above_peak_energy() {
        let yaml = "beam:\n  energy_max_tev: 1.0\n  collapse_threshold_tev: 2.0\n";
        let config = BeamlineConfig::parse(yaml);
        assert!(matches!(config, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_non_positive_frequency() {
        let yaml = "beam:\n  base_angular_frequency: 0.0\n";
        assert!(matches!(
            BeamlineConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_too_fast_scheduler() {
        let yaml = "scheduler:\n  tick_interval_ms: 1\n";
        assert!(matches!(
            BeamlineConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_inverted_kick_range() {
        let yaml = "recorder:\n  kick_power_min: 9.0\n  kick_power_max: 3.0\n";
        assert!(matches!(
            BeamlineConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let yaml = "beam: [not, a, map";
        assert!(matches!(
            BeamlineConfig::parse(yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn env_overrides_port_and_mode() {
        let mut config = BeamlineConfig::default();
        config.apply_overrides_from(|key| match key {
            "BEAMLINE_PORT" => Some("8081".to_owned()),
            "BEAMLINE_MODE" => Some("recorder".to_owned()),
            _ => None,
        });
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.mode, OperatingMode::Recorder);
    }

    #[test]
    fn invalid_env_overrides_are_ignored() {
        let mut config = BeamlineConfig::default();
        config.apply_overrides_from(|key| match key {
            "BEAMLINE_PORT" => Some("not-a-port".to_owned()),
            "BEAMLINE_MODE" => Some("hybrid".to_owned()),
            _ => None,
        });
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.mode, OperatingMode::Simulator);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("beamline-config.yaml");
        if path.exists() {
            let config = BeamlineConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
