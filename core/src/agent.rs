//! Navigation agent contract.
//!
//! The agent is a black box: given the vehicle it drives and a destination,
//! it plans a route on its own and emits one control command per tick.
//! The controller hands it only the vehicle handle and the destination,
//! never the session.

use crate::{
    config::{AgentKind, BehaviorProfile, BASIC_TARGET_SPEED},
    error::SimResult,
    simulator::ControlCommand,
    types::Location,
};
use serde::{Deserialize, Serialize};

pub trait NavigationAgent {
    /// Start planning toward `destination`. Planning failures are the
    /// agent's own concern.
    fn set_destination(&mut self, destination: Location) -> SimResult<()>;

    /// True once the destination has been reached.
    fn is_done(&self) -> SimResult<bool>;

    /// Next control command for the current tick.
    fn run_step(&mut self) -> SimResult<ControlCommand>;
}

/// Which agent to build, and how to configure it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentSpec {
    /// Fixed cruising speed (km/h), optionally capped by posted limits.
    Basic {
        target_speed:        f64,
        follow_speed_limits: bool,
    },
    /// Driving style chosen from a named profile.
    Behavior { profile: BehaviorProfile },
}

impl AgentSpec {
    /// Basic agents cruise at 30 and always follow posted limits.
    pub fn basic() -> Self {
        Self::Basic {
            target_speed:        BASIC_TARGET_SPEED,
            follow_speed_limits: true,
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Self::Basic { .. } => AgentKind::Basic,
            Self::Behavior { .. } => AgentKind::Behavior,
        }
    }
}
