//! Beam physics, control state, and tick scheduling for the Beamline
//! accelerator simulation.
//!
//! This crate owns the single shared beam. Everything that reads or
//! mutates it goes through [`SimulationCore`], which publishes every change
//! into a [`MetricsSink`] under the same lock.
//!
//! # Modules
//!
//! - [`beam`] -- The beam model: one step from the previous state and the
//!   elapsed run time to the next state.
//! - [`clock`] -- Monotonic time sources, real and manual.
//! - [`config`] -- Configuration loading from `beamline-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- The `Stopped` / `Running` / `Failed` state machine.
//! - [`kick`] -- Seeded kick-power draws for recorder mode.
//! - [`relativity`] -- Speed to energy conversions for observed particles.
//! - [`scheduler`] -- The fixed-cadence tick loop.
//! - [`simulation`] -- [`SimulationCore`], the shared beam.
//! - [`sink`] -- [`MetricsSink`] trait and the gauges it carries.
//!
//! [`SimulationCore`]: simulation::SimulationCore
//! [`MetricsSink`]: sink::MetricsSink

pub mod beam;
pub mod clock;
pub mod config;
pub mod control;
pub mod kick;
pub mod relativity;
pub mod scheduler;
pub mod simulation;
pub mod sink;
