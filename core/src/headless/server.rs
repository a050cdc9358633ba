//! In-process stand-in for the simulation server.
//!
//! All handles handed out (connection, world, traffic coordinator,
//! vehicles) share one `ServerState`, the way remote handles share one
//! server. Vehicles follow a kinematic unicycle model, advanced once per
//! world tick with the last control applied to them.

use crate::{
    config::Endpoint,
    error::{SimError, SimResult},
    simulator::{
        Connection, ControlCommand, TrafficCoordinator, Vehicle, VehicleHandle, VehicleState,
        World, WorldSettings,
    },
    types::{ActorId, FrameId, Location, Transform},
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

pub const KNOWN_MAPS: &[&str] = &["Town01", "Town02", "Town03", "Town04", "Town05", "Town10HD_Opt"];

/// Seconds per tick when the server runs on its own clock.
pub const FREE_RUNNING_DELTA: f64 = 0.05;

/// Posted limit on every road of every headless map, km/h.
pub const SPEED_LIMIT_KMH: f64 = 30.0;

const SPAWN_SPACING: f64 = 40.0;
const MAX_ACCEL: f64 = 4.0;
const MAX_DECEL: f64 = 8.0;
const ROLLING_DRAG: f64 = 0.3;
const MAX_YAW_RATE: f64 = 1.0; // rad/s at full steer
const MAX_SPEED: f64 = 50.0;

#[derive(Debug, Clone)]
struct VehicleBody {
    transform: Transform,
    speed:     f64,
    control:   ControlCommand,
}

impl VehicleBody {
    fn integrate(&mut self, dt: f64) {
        let c = &self.control;
        let mut accel = c.throttle.clamp(0.0, 1.0) * MAX_ACCEL - c.brake.clamp(0.0, 1.0) * MAX_DECEL;
        if c.hand_brake {
            accel = -MAX_DECEL;
        }
        if self.speed > 0.0 {
            accel -= ROLLING_DRAG;
        }
        self.speed = (self.speed + accel * dt).clamp(0.0, MAX_SPEED);

        let yaw = self.transform.rotation.yaw.to_radians() + c.steer.clamp(-1.0, 1.0) * MAX_YAW_RATE * dt;
        let direction = if c.reverse { -1.0 } else { 1.0 };
        self.transform.location.x += direction * self.speed * yaw.cos() * dt;
        self.transform.location.y += direction * self.speed * yaw.sin() * dt;
        self.transform.rotation.yaw = yaw.to_degrees().rem_euclid(360.0);
    }
}

#[derive(Debug)]
struct ServerState {
    maps:             Vec<String>,
    loaded_map:       Option<String>,
    spawn_points:     Vec<Transform>,
    settings:         WorldSettings,
    traffic_sync:     bool,
    frame:            FrameId,
    sim_seconds:      f64,
    next_actor:       ActorId,
    vehicles:         BTreeMap<ActorId, VehicleBody>,
    open_connections: usize,
    reachable:        bool,
    connection_lost:  bool,
    controls_applied: u64,
    settings_applied: Vec<WorldSettings>,
}

impl ServerState {
    fn ensure_alive(&self) -> SimResult<()> {
        if self.connection_lost {
            return Err(SimError::connection("connection to simulator lost"));
        }
        Ok(())
    }

    fn advance(&mut self, dt: f64) -> FrameId {
        for body in self.vehicles.values_mut() {
            body.integrate(dt);
        }
        self.frame += 1;
        self.sim_seconds += dt;
        self.frame
    }
}

/// Grid of spawn points for `map`. Size depends on the map so each one
/// looks a little different; layout is fixed so seeds are reproducible.
pub fn spawn_points_for(map: &str) -> Vec<Transform> {
    let index = KNOWN_MAPS.iter().position(|m| *m == map).unwrap_or(0);
    let side = 4 + index % 3;
    (0..side * side)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            let location = Location::new(col as f64 * SPAWN_SPACING, row as f64 * SPAWN_SPACING, 0.3);
            Transform::new(location, ((i * 90) % 360) as f64)
        })
        .collect()
}

/// Handle to a headless server. Clones share the same server.
#[derive(Debug, Clone)]
pub struct HeadlessSimulator {
    state: Rc<RefCell<ServerState>>,
}

impl Default for HeadlessSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSimulator {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ServerState {
                maps:             KNOWN_MAPS.iter().map(|m| m.to_string()).collect(),
                loaded_map:       None,
                spawn_points:     Vec::new(),
                settings:         WorldSettings::default(),
                traffic_sync:     false,
                frame:            0,
                sim_seconds:      0.0,
                next_actor:       1,
                vehicles:         BTreeMap::new(),
                open_connections: 0,
                reachable:        true,
                connection_lost:  false,
                controls_applied: 0,
                settings_applied: Vec::new(),
            })),
        }
    }

    /// Server that never answers.
    pub fn unreachable() -> Self {
        let sim = Self::new();
        sim.state.borrow_mut().reachable = false;
        sim
    }

    /// Open a client connection, as the platform does on `connect`.
    pub fn connect(&self, endpoint: &Endpoint) -> SimResult<HeadlessConnection> {
        let mut state = self.state.borrow_mut();
        if !state.reachable {
            return Err(SimError::connection(format!(
                "no simulator answered at {endpoint} within {:?}",
                endpoint.timeout
            )));
        }
        state.open_connections += 1;
        log::debug!("headless: client connected to {endpoint}");
        Ok(HeadlessConnection { sim: self.clone() })
    }

    /// Make every later server call fail, as if the network dropped.
    pub fn drop_connection(&self) {
        self.state.borrow_mut().connection_lost = true;
    }

    pub fn settings(&self) -> WorldSettings {
        self.state.borrow().settings
    }

    /// Every settings value pushed by clients, in order.
    pub fn settings_history(&self) -> Vec<WorldSettings> {
        self.state.borrow().settings_applied.clone()
    }

    /// Preset world settings, as left behind by some earlier client.
    pub fn preset_settings(&self, settings: WorldSettings) {
        self.state.borrow_mut().settings = settings;
    }

    pub fn traffic_synchronous(&self) -> bool {
        self.state.borrow().traffic_sync
    }

    pub fn loaded_map(&self) -> Option<String> {
        self.state.borrow().loaded_map.clone()
    }

    pub fn open_connections(&self) -> usize {
        self.state.borrow().open_connections
    }

    pub fn vehicle_count(&self) -> usize {
        self.state.borrow().vehicles.len()
    }

    pub fn controls_applied(&self) -> u64 {
        self.state.borrow().controls_applied
    }

    pub fn frame(&self) -> FrameId {
        self.state.borrow().frame
    }

    pub fn sim_seconds(&self) -> f64 {
        self.state.borrow().sim_seconds
    }
}

// ── Client-side handles ────────────────────────────────────────────

pub struct HeadlessConnection {
    sim: HeadlessSimulator,
}

impl Drop for HeadlessConnection {
    fn drop(&mut self) {
        let mut state = self.sim.state.borrow_mut();
        state.open_connections = state.open_connections.saturating_sub(1);
    }
}

impl Connection for HeadlessConnection {
    fn load_map(&mut self, name: &str) -> SimResult<()> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        if !state.maps.iter().any(|m| m == name) {
            return Err(SimError::connection(format!("map '{name}' not available on server")));
        }
        state.loaded_map = Some(name.to_string());
        state.spawn_points = spawn_points_for(name);
        state.vehicles.clear();
        log::info!("headless: loaded map {name} ({} spawn points)", state.spawn_points.len());
        Ok(())
    }

    fn traffic_coordinator(&mut self) -> SimResult<Box<dyn TrafficCoordinator>> {
        self.sim.state.borrow().ensure_alive()?;
        Ok(Box::new(HeadlessTraffic { sim: self.sim.clone() }))
    }

    fn world(&mut self) -> SimResult<Box<dyn World>> {
        self.sim.state.borrow().ensure_alive()?;
        Ok(Box::new(HeadlessWorld { sim: self.sim.clone() }))
    }
}

struct HeadlessTraffic {
    sim: HeadlessSimulator,
}

impl TrafficCoordinator for HeadlessTraffic {
    fn set_synchronous_mode(&mut self, enabled: bool) -> SimResult<()> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        state.traffic_sync = enabled;
        Ok(())
    }
}

struct HeadlessWorld {
    sim: HeadlessSimulator,
}

impl World for HeadlessWorld {
    fn settings(&self) -> SimResult<WorldSettings> {
        let state = self.sim.state.borrow();
        state.ensure_alive()?;
        Ok(state.settings)
    }

    fn apply_settings(&mut self, settings: &WorldSettings) -> SimResult<()> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        state.settings = *settings;
        state.settings_applied.push(*settings);
        Ok(())
    }

    fn tick(&mut self) -> SimResult<FrameId> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        if !state.settings.synchronous_mode {
            return Err(SimError::backend("tick() requested while the world is asynchronous"));
        }
        let dt = state.settings.fixed_delta_seconds.unwrap_or(FREE_RUNNING_DELTA);
        Ok(state.advance(dt))
    }

    fn wait_for_tick(&mut self) -> SimResult<FrameId> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        if state.settings.synchronous_mode {
            return Err(SimError::backend(
                "wait_for_tick() in synchronous mode would block forever",
            ));
        }
        Ok(state.advance(FREE_RUNNING_DELTA))
    }

    fn spawn_points(&self) -> SimResult<Vec<Transform>> {
        let state = self.sim.state.borrow();
        state.ensure_alive()?;
        Ok(state.spawn_points.clone())
    }

    fn spawn_vehicle(&mut self, at: &Transform) -> SimResult<VehicleHandle> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        let id = state.next_actor;
        state.next_actor += 1;
        state.vehicles.insert(
            id,
            VehicleBody { transform: *at, speed: 0.0, control: ControlCommand::default() },
        );
        Ok(Rc::new(HeadlessVehicle { sim: self.sim.clone(), id }))
    }
}

struct HeadlessVehicle {
    sim: HeadlessSimulator,
    id:  ActorId,
}

impl HeadlessVehicle {
    fn missing(&self) -> SimError {
        SimError::backend(format!("actor {} not found", self.id))
    }
}

impl Vehicle for HeadlessVehicle {
    fn id(&self) -> ActorId {
        self.id
    }

    fn state(&self) -> SimResult<VehicleState> {
        let state = self.sim.state.borrow();
        state.ensure_alive()?;
        let body = state.vehicles.get(&self.id).ok_or_else(|| self.missing())?;
        Ok(VehicleState { transform: body.transform, speed: body.speed })
    }

    fn apply_control(&self, control: &ControlCommand) -> SimResult<()> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        let body = state.vehicles.get_mut(&self.id).ok_or_else(|| self.missing())?;
        body.control = *control;
        state.controls_applied += 1;
        Ok(())
    }

    fn speed_limit(&self) -> SimResult<Option<f64>> {
        self.sim.state.borrow().ensure_alive()?;
        Ok(Some(SPEED_LIMIT_KMH))
    }

    fn destroy(&self) -> SimResult<()> {
        let mut state = self.sim.state.borrow_mut();
        state.ensure_alive()?;
        state.vehicles.remove(&self.id).map(|_| ()).ok_or_else(|| self.missing())
    }
}
