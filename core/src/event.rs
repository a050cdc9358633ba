//! The session event log.
//!
//! RULE: every externally visible state change of a session is appended
//! here by the controller, in the order it happened. Two sessions with the
//! same seed against the same deterministic server produce identical logs.

use crate::{
    simulator::ControlCommand,
    time_stepping::TimeSteppingMode,
    types::{ActorId, FrameId, Location, Tick, Transform},
};
use serde::{Deserialize, Serialize};

/// Variants are appended only. Never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Init ───────────────────────────────────────
    SessionStarted {
        map:  String,
        seed: Option<u64>,
        mode: TimeSteppingMode,
    },
    VehicleSpawned {
        actor_id: ActorId,
        at:       Transform,
    },
    DestinationChosen {
        location:        Location,
        candidate_count: usize,
    },

    // ── Step ───────────────────────────────────────
    ControlApplied {
        tick:    Tick,
        frame:   FrameId,
        control: ControlCommand,
    },
    Arrived {
        tick:  Tick,
        frame: FrameId,
    },
    Cancelled {
        tick: Tick,
    },

    // ── Teardown ───────────────────────────────────
    SettingsRestored,
    TeardownWarning {
        message: String,
    },
    SessionDestroyed {
        ticks: Tick,
    },
}

impl SessionEvent {
    /// Stable name, used as the `type` tag in serialized logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. }    => "session_started",
            Self::VehicleSpawned { .. }    => "vehicle_spawned",
            Self::DestinationChosen { .. } => "destination_chosen",
            Self::ControlApplied { .. }    => "control_applied",
            Self::Arrived { .. }           => "arrived",
            Self::Cancelled { .. }         => "cancelled",
            Self::SettingsRestored         => "settings_restored",
            Self::TeardownWarning { .. }   => "teardown_warning",
            Self::SessionDestroyed { .. }  => "session_destroyed",
        }
    }
}

/// Write events as JSON lines.
pub fn write_json_lines<W: std::io::Write>(
    out: &mut W,
    events: &[SessionEvent],
) -> crate::error::SimResult<()> {
    for event in events {
        serde_json::to_writer(&mut *out, event)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
