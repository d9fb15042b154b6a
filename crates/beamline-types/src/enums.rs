//! Enumeration types for the Beamline simulation.
//!
//! Covers the operational state of the single global beam, the integer
//! status codes used by the browser client and the `beam_status` gauge,
//! command outcomes, and the process-wide operating mode.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Control state
// ---------------------------------------------------------------------------

/// Operational state of the beam.
///
/// Exactly one variant holds at any instant. `Failed` is terminal for
/// commands: only a process restart (or, in recorder mode, an authoritative
/// status observation) leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ControlState {
    /// The beam is off. Physics does not advance.
    #[default]
    Stopped,
    /// The beam circulates and is advanced on every tick.
    Running,
    /// The beam collapsed below the energy threshold.
    Failed,
}

impl ControlState {
    /// Whether the beam is currently circulating.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the beam has collapsed.
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The status code reported for this state on the `beam_status` gauge.
    ///
    /// A collapsed beam is reported as [`BeamStatus::Overloaded`], the
    /// client's code for a lost beam.
    pub const fn status(self) -> BeamStatus {
        match self {
            Self::Stopped => BeamStatus::Stopped,
            Self::Running => BeamStatus::Running,
            Self::Failed => BeamStatus::Overloaded,
        }
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Integer status codes shared with the browser client.
///
/// | Code | Meaning |
/// |------|---------|
/// | 0 | stopped |
/// | 1 | running |
/// | 2 | success (light-speed cap reached) |
/// | 3 | overloaded (beam lost) |
/// | 4 | timeout |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BeamStatus {
    /// Code 0.
    Stopped,
    /// Code 1.
    Running,
    /// Code 2.
    Success,
    /// Code 3.
    Overloaded,
    /// Code 4.
    Timeout,
}

impl BeamStatus {
    /// Numeric code of this status.
    pub const fn code(self) -> i64 {
        match self {
            Self::Stopped => 0,
            Self::Running => 1,
            Self::Success => 2,
            Self::Overloaded => 3,
            Self::Timeout => 4,
        }
    }

    /// Parse a numeric code. Returns `None` for unknown codes.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::Running),
            2 => Some(Self::Success),
            3 => Some(Self::Overloaded),
            4 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// The control state implied by an externally observed status.
    ///
    /// A successful beam is still circulating; a timed-out one has been
    /// switched off by the client.
    pub const fn control_state(self) -> ControlState {
        match self {
            Self::Stopped | Self::Timeout => ControlState::Stopped,
            Self::Running | Self::Success => ControlState::Running,
            Self::Overloaded => ControlState::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Command outcomes
// ---------------------------------------------------------------------------

/// Result of a start command, reported verbatim to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StartOutcome {
    /// `Stopped -> Running`; timers and drift were reset.
    #[serde(rename = "started")]
    Started,
    /// The beam was already running; nothing changed.
    #[serde(rename = "running")]
    AlreadyRunning,
    /// The beam has collapsed and cannot be restarted.
    #[serde(rename = "failed")]
    Failed,
}

impl StartOutcome {
    /// Wire representation (`started`, `running`, `failed`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::AlreadyRunning => "running",
            Self::Failed => "failed",
        }
    }
}

/// Result of a stop command, reported verbatim to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StopOutcome {
    /// `Running -> Stopped`.
    #[serde(rename = "stopped")]
    Stopped,
    /// Already stopped; stop is idempotent.
    #[serde(rename = "stopped")]
    AlreadyStopped,
    /// The beam has collapsed; the failure is terminal.
    #[serde(rename = "failed")]
    Failed,
}

impl StopOutcome {
    /// Wire representation (`stopped`, `failed`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped | Self::AlreadyStopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// How the core produces the published beam values.
///
/// Fixed at startup. The two modes never write the same gauges
/// concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperatingMode {
    /// The core advances the beam model on every scheduler tick.
    #[default]
    Simulator,
    /// The core records status/speed observations posted by an external feed.
    Recorder,
}

impl OperatingMode {
    /// Parse a mode name (case-insensitive). Returns `None` if unknown.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "simulator" | "active" => Some(Self::Simulator),
            "recorder" | "passive" => Some(Self::Recorder),
            _ => None,
        }
    }

    /// Lowercase name of the mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simulator => "simulator",
            Self::Recorder => "recorder",
        }
    }
}
