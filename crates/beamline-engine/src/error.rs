//! Error types for the Beamline binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and shutdown.

/// Top-level error for the Beamline binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: beamline_core::config::ConfigError,
    },

    /// The beam parameters were rejected by the model.
    #[error("beam model error: {source}")]
    Beam {
        /// The underlying model error.
        #[from]
        source: beamline_core::beam::BeamError,
    },

    /// The Prometheus registry could not be built.
    #[error("metrics error: {source}")]
    Metrics {
        /// The underlying metrics error.
        #[from]
        source: beamline_observer::metrics::MetricsError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: beamline_observer::startup::StartupError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
