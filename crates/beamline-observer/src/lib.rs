//! Observer API server for the Beamline simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Command endpoints** (`/start`, `/stop`) driving the beam's control
//!   state machine
//! - **State endpoints** (`GET /state`, `GET /api/snapshot`) reading a
//!   consistent copy of the beam, and `POST /state` for status reports from
//!   an external feed in recorder mode
//! - **Prometheus exporter** (`/metrics`) backed by [`PrometheusSink`], the
//!   sink the simulation core publishes into
//! - **Kick-power draws** (`/kick_power`) for the browser client
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Handlers call straight into the shared
//! [`SimulationCore`](beamline_core::simulation::SimulationCore). The core
//! serializes commands, observations and ticks behind one lock, so a
//! handler always sees the state either before or after a tick.
//!
//! [`PrometheusSink`]: metrics::PrometheusSink

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use metrics::PrometheusSink;
pub use router::build_router;
pub use server::ServerError;
pub use state::AppState;
