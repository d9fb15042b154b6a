//! Shared type definitions for the Beamline accelerator simulation.
//!
//! Types defined here are used by the simulation core, the observer API and
//! the engine binary, and flow to `TypeScript` via `ts-rs` for the status
//! page.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for beam runs
//! - [`enums`] -- Control state, status codes, command outcomes, modes
//! - [`structs`] -- Beam state, snapshots, and recorder payloads

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BeamStatus, ControlState, OperatingMode, StartOutcome, StopOutcome};
pub use ids::RunId;
pub use structs::{
    BeamSnapshot, BeamState, KickPower, StateSummary, StatusObservation, normalize_degrees,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::RunId::export_all();

        let _ = crate::enums::ControlState::export_all();
        let _ = crate::enums::BeamStatus::export_all();
        let _ = crate::enums::StartOutcome::export_all();
        let _ = crate::enums::StopOutcome::export_all();
        let _ = crate::enums::OperatingMode::export_all();

        let _ = crate::structs::BeamState::export_all();
        let _ = crate::structs::BeamSnapshot::export_all();
        let _ = crate::structs::StateSummary::export_all();
        let _ = crate::structs::StatusObservation::export_all();
        let _ = crate::structs::KickPower::export_all();
    }
}
