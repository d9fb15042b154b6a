//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the simulation core the handlers command and read,
//! the Prometheus sink the core publishes into, and the kick generator.

use std::sync::Arc;

use beamline_core::kick::KickGenerator;
use beamline_core::simulation::SimulationCore;

use crate::metrics::PrometheusSink;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The core
/// is also held by the scheduler task, so it is reference counted on its
/// own.
#[derive(Debug)]
pub struct AppState {
    /// The single shared beam.
    pub core: Arc<SimulationCore>,
    /// The gauges `GET /metrics` exports. The core writes into the same sink.
    pub metrics: Arc<PrometheusSink>,
    /// Source of `GET /kick_power` values.
    pub kick: KickGenerator,
}

impl AppState {
    /// Bundle the shared collaborators.
    pub const fn new(
        core: Arc<SimulationCore>,
        metrics: Arc<PrometheusSink>,
        kick: KickGenerator,
    ) -> Self {
        Self {
            core,
            metrics,
            kick,
        }
    }
}
