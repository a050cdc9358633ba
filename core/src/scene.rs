//! Local representation of the world: the player vehicle, the map's spawn
//! points and the HUD that reports on them.

use crate::{
    clock::PacingClock,
    error::{SimError, SimResult},
    frontend::{Display, Hud},
    rng::SimRng,
    simulator::{VehicleHandle, VehicleState, World},
    types::Transform,
};

pub struct Scene {
    vehicle:      VehicleHandle,
    hud:          Box<dyn Hud>,
    spawn_points: Vec<Transform>,
    last_state:   VehicleState,
    destroyed:    bool,
}

impl Scene {
    /// Read the map's spawn points and spawn the player at one of them.
    /// This is the first draw from `rng` in a session.
    pub fn spawn(world: &mut dyn World, hud: Box<dyn Hud>, rng: &mut SimRng) -> SimResult<Self> {
        let spawn_points = world.spawn_points()?;
        let at = *rng
            .choose(&spawn_points)
            .ok_or_else(|| SimError::backend("map has no spawn points"))?;
        let vehicle = world.spawn_vehicle(&at)?;
        let last_state = vehicle.state()?;
        log::info!(
            "Spawned vehicle {} at ({:.1}, {:.1})",
            vehicle.id(),
            at.location.x,
            at.location.y
        );
        Ok(Self {
            vehicle,
            hud,
            spawn_points,
            last_state,
            destroyed: false,
        })
    }

    pub fn vehicle(&self) -> VehicleHandle {
        self.vehicle.clone()
    }

    pub fn spawn_points(&self) -> &[Transform] {
        &self.spawn_points
    }

    /// Vehicle state as of the last `tick`.
    pub fn vehicle_state(&self) -> &VehicleState {
        &self.last_state
    }

    /// Refresh actor state and HUD metrics for this tick.
    pub fn tick(&mut self, clock: &PacingClock) -> SimResult<()> {
        self.last_state = self.vehicle.state()?;
        self.hud.tick(clock, &self.last_state);
        Ok(())
    }

    pub fn render(&mut self, display: &mut dyn Display) -> SimResult<()> {
        self.hud.render(display)
    }

    /// Destroy the actors this scene spawned. Safe to call twice.
    pub fn destroy(&mut self) -> SimResult<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        log::debug!("Destroying vehicle {}", self.vehicle.id());
        self.vehicle.destroy()
    }
}
