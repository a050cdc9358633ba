//! Time-stepping contract between controller and server.
//!
//! RULE: the world's synchronous flag and the traffic coordinator's
//! synchronous flag change together, through this module only. A world in
//! synchronous mode with asynchronous traffic has undefined tick ordering.

use crate::{
    error::SimResult,
    simulator::{TrafficCoordinator, World, WorldSettings},
    types::FrameId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeSteppingMode {
    /// The controller requests each tick; `fixed_delta` seconds per tick.
    Synchronous { fixed_delta: f64 },
    /// The server ticks on its own; the controller waits for each one.
    Asynchronous,
}

impl TimeSteppingMode {
    pub fn is_synchronous(&self) -> bool {
        matches!(self, Self::Synchronous { .. })
    }

    pub fn fixed_delta(&self) -> Option<f64> {
        match self {
            Self::Synchronous { fixed_delta } => Some(*fixed_delta),
            Self::Asynchronous => None,
        }
    }

    /// Put world and traffic coordinator into this mode.
    ///
    /// Returns the world settings as they were before, when they were
    /// changed. Asynchronous mode leaves the server untouched.
    pub fn engage(
        &self,
        world: &mut dyn World,
        traffic: &mut dyn TrafficCoordinator,
    ) -> SimResult<Option<WorldSettings>> {
        let Self::Synchronous { fixed_delta } = *self else {
            return Ok(None);
        };

        let previous = world.settings()?;
        let settings = WorldSettings {
            synchronous_mode:    true,
            fixed_delta_seconds: Some(fixed_delta),
            ..previous
        };
        world.apply_settings(&settings)?;
        traffic.set_synchronous_mode(true)?;
        log::info!("Synchronous mode engaged (fixed_delta={fixed_delta}s)");
        Ok(Some(previous))
    }

    /// Advance simulated time by one server tick. The only place the
    /// session blocks on the server.
    pub fn advance(&self, world: &mut dyn World) -> SimResult<FrameId> {
        match self {
            Self::Synchronous { .. } => world.tick(),
            Self::Asynchronous => world.wait_for_tick(),
        }
    }

    /// Return the world to free-running mode.
    ///
    /// World settings always end up asynchronous with no fixed step, based
    /// on `previous` when it was captured. The traffic coordinator is set
    /// back to asynchronous only if this mode had engaged it. The world
    /// write is attempted even if the traffic write fails.
    pub fn release(
        &self,
        world: &mut dyn World,
        traffic: &mut dyn TrafficCoordinator,
        previous: Option<WorldSettings>,
    ) -> SimResult<()> {
        let base = match previous {
            Some(settings) => settings,
            None => world.settings()?,
        };
        let settings = WorldSettings {
            synchronous_mode:    false,
            fixed_delta_seconds: None,
            ..base
        };
        let world_result = world.apply_settings(&settings);
        let traffic_result = if self.is_synchronous() {
            traffic.set_synchronous_mode(false)
        } else {
            Ok(())
        };
        world_result?;
        traffic_result?;
        log::info!("World settings restored to asynchronous mode");
        Ok(())
    }
}
