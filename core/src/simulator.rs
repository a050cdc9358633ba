//! The simulation server as seen from the controller.
//!
//! These traits are the whole surface the session touches on the server
//! side. Concrete bindings live outside this crate (or in `headless` for
//! the in-process reference server). Every call may block on one server
//! round-trip and may fail with `SimError::Connection` / `SimError::Backend`.

use crate::{
    error::SimResult,
    types::{ActorId, FrameId, Transform},
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Server-side world settings that the session reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub synchronous_mode:    bool,
    pub fixed_delta_seconds: Option<f64>,
    pub no_rendering_mode:   bool,
}

/// One tick's worth of vehicle input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    /// [-1.0, 1.0], negative = left.
    pub steer:             f64,
    /// [0.0, 1.0]
    pub throttle:          f64,
    /// [0.0, 1.0]
    pub brake:             f64,
    pub hand_brake:        bool,
    pub reverse:           bool,
    pub manual_gear_shift: bool,
    pub gear:              i32,
}

/// Snapshot of the controllable vehicle, refreshed once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub transform: Transform,
    /// m/s
    pub speed:     f64,
}

impl VehicleState {
    pub fn speed_kmh(&self) -> f64 {
        self.speed * 3.6
    }
}

/// An open client connection to the server.
pub trait Connection {
    /// Load `name` and wait until the server reports it ready.
    fn load_map(&mut self, name: &str) -> SimResult<()>;

    fn traffic_coordinator(&mut self) -> SimResult<Box<dyn TrafficCoordinator>>;

    fn world(&mut self) -> SimResult<Box<dyn World>>;
}

/// The live world on the server.
pub trait World {
    fn settings(&self) -> SimResult<WorldSettings>;

    fn apply_settings(&mut self, settings: &WorldSettings) -> SimResult<()>;

    /// Synchronous mode only: request one tick, block until it resolves.
    fn tick(&mut self) -> SimResult<FrameId>;

    /// Asynchronous mode: block until the server's next own tick.
    fn wait_for_tick(&mut self) -> SimResult<FrameId>;

    /// Predefined spawn locations of the loaded map.
    fn spawn_points(&self) -> SimResult<Vec<Transform>>;

    /// Spawn the controllable vehicle at `at`.
    fn spawn_vehicle(&mut self, at: &Transform) -> SimResult<VehicleHandle>;
}

/// Manages background traffic and its own tick synchronisation.
pub trait TrafficCoordinator {
    fn set_synchronous_mode(&mut self, enabled: bool) -> SimResult<()>;
}

/// A server-side vehicle actor. Shared between the scene and the agent,
/// so every method takes `&self`.
pub trait Vehicle {
    fn id(&self) -> ActorId;

    fn state(&self) -> SimResult<VehicleState>;

    fn apply_control(&self, control: &ControlCommand) -> SimResult<()>;

    /// Posted speed limit at the vehicle's position, km/h.
    fn speed_limit(&self) -> SimResult<Option<f64>> {
        Ok(None)
    }

    fn destroy(&self) -> SimResult<()>;
}

pub type VehicleHandle = Rc<dyn Vehicle>;
