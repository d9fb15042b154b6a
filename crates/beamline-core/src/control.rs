//! Control state machine for the single global beam.
//!
//! ```text
//!            start                     energy < threshold
//!  Stopped ---------> Running ---------------------------> Failed
//!     ^                  |                                 (terminal)
//!     +------ stop ------+
//! ```
//!
//! `start` while running is a no-op. `start` and `stop` while failed are
//! rejected and report the failure. Resetting the beam state on an
//! accepted start is the caller's job; the machine only decides.

use beamline_types::{ControlState, StartOutcome, StopOutcome};

/// The control state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlMachine {
    state: ControlState,
}

impl ControlMachine {
    /// A machine in the [`ControlState::Stopped`] state.
    pub const fn new() -> Self {
        Self {
            state: ControlState::Stopped,
        }
    }

    /// The current state.
    pub const fn state(&self) -> ControlState {
        self.state
    }

    /// Handle a start command.
    pub const fn request_start(&mut self) -> StartOutcome {
        match self.state {
            ControlState::Stopped => {
                self.state = ControlState::Running;
                StartOutcome::Started
            }
            ControlState::Running => StartOutcome::AlreadyRunning,
            ControlState::Failed => StartOutcome::Failed,
        }
    }

    /// Handle a stop command. Idempotent while stopped.
    pub const fn request_stop(&mut self) -> StopOutcome {
        match self.state {
            ControlState::Running => {
                self.state = ControlState::Stopped;
                StopOutcome::Stopped
            }
            ControlState::Stopped => StopOutcome::AlreadyStopped,
            ControlState::Failed => StopOutcome::Failed,
        }
    }

    /// Force `Running -> Failed` when `energy_tev` is below `threshold_tev`.
    ///
    /// Returns `true` only when this call performed the transition. Has no
    /// effect outside [`ControlState::Running`].
    pub const fn evaluate_collapse(&mut self, energy_tev: f64, threshold_tev: f64) -> bool {
        if self.state.is_running() && energy_tev < threshold_tev {
            self.state = ControlState::Failed;
            true
        } else {
            false
        }
    }

    /// Overwrite the state from an authoritative external observation.
    ///
    /// Only the recorder path uses this; commands always go through
    /// [`request_start`](Self::request_start) and
    /// [`request_stop`](Self::request_stop).
    pub const fn force(&mut self, state: ControlState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_machine() -> ControlMachine {
        let mut machine = ControlMachine::new();
        let _ = machine.request_start();
        assert!(machine.evaluate_collapse(0.0, 0.05));
        machine
    }

    #[test]
    fn starts_stopped() {
        assert_eq!(ControlMachine::new().state(), ControlState::Stopped);
    }

    #[test]
    fn start_from_stopped_runs() {
        let mut machine = ControlMachine::new();
        assert_eq!(machine.request_start(), StartOutcome::Started);
        assert_eq!(machine.state(), ControlState::Running);
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut machine = ControlMachine::new();
        let _ = machine.request_start();
        assert_eq!(machine.request_start(), StartOutcome::AlreadyRunning);
        assert_eq!(machine.state(), ControlState::Running);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut machine = ControlMachine::new();
        let _ = machine.request_start();
        assert_eq!(machine.request_stop(), StopOutcome::Stopped);
        assert_eq!(machine.request_stop(), StopOutcome::AlreadyStopped);
        assert_eq!(machine.state(), ControlState::Stopped);
    }

    #[test]
    fn collapse_only_below_threshold() {
        let mut machine = ControlMachine::new();
        let _ = machine.request_start();
        assert!(!machine.evaluate_collapse(0.05, 0.05));
        assert_eq!(machine.state(), ControlState::Running);
        assert!(machine.evaluate_collapse(0.049, 0.05));
        assert_eq!(machine.state(), ControlState::Failed);
    }

    #[test]
    fn collapse_ignored_when_not_running() {
        let mut machine = ControlMachine::new();
        assert!(!machine.evaluate_collapse(0.0, 0.05));
        assert_eq!(machine.state(), ControlState::Stopped);
    }

    #[test]
    fn failure_is_terminal_for_commands() {
        let mut machine = failed_machine();
        for _ in 0..3 {
            assert_eq!(machine.request_start(), StartOutcome::Failed);
            assert_eq!(machine.request_stop(), StopOutcome::Failed);
            assert_eq!(machine.state(), ControlState::Failed);
        }
        // A second collapse evaluation does not report another transition.
        assert!(!machine.evaluate_collapse(0.0, 0.05));
    }

    #[test]
    fn force_overrides_failure() {
        let mut machine = failed_machine();
        machine.force(ControlState::Running);
        assert_eq!(machine.state(), ControlState::Running);
    }
}
