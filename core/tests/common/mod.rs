//! Scripted collaborators for controller tests.
//!
//! Every fake records its calls into one shared `Probe`, so tests can
//! assert the exact order in which the controller touched the outside world.

#![allow(dead_code)]

use autopilot_core::{
    agent::{AgentSpec, NavigationAgent},
    clock::PacingClock,
    config::{Endpoint, Resolution},
    error::{SimError, SimResult},
    frontend::{Display, Hud, InputHandler, Platform},
    simulator::{
        Connection, ControlCommand, TrafficCoordinator, Vehicle, VehicleHandle, VehicleState,
        World, WorldSettings,
    },
    types::{ActorId, FrameId, Location, Transform},
};
use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Default)]
pub struct Probe {
    pub calls:            Vec<&'static str>,
    pub frame:            FrameId,
    pub settings:         WorldSettings,
    pub traffic_sync:     Option<bool>,
    pub controls:         Vec<ControlCommand>,
    pub open_connections: i32,
    pub display_closed:   bool,
    pub vehicle_alive:    bool,
    pub destination:      Option<Location>,

    // Script
    pub cancel_on_frame:    Option<FrameId>,
    pub done_from_frame:    Option<FrameId>,
    pub fail_tick_on_frame: Option<FrameId>,
    pub fail_display:       bool,
    pub lose_connection:    bool,
}

pub type SharedProbe = Rc<RefCell<Probe>>;

fn record(probe: &SharedProbe, call: &'static str) {
    probe.borrow_mut().calls.push(call);
}

fn ensure_connected(probe: &SharedProbe) -> SimResult<()> {
    if probe.borrow().lose_connection {
        return Err(SimError::connection("scripted connection loss"));
    }
    Ok(())
}

pub fn spawn_points() -> Vec<Transform> {
    (0..8)
        .map(|i| Transform::new(Location::new(i as f64 * 10.0, -(i as f64) * 5.0, 0.0), 0.0))
        .collect()
}

// ── Server side ────────────────────────────────────────────────────

struct ScriptedConnection(SharedProbe);

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.0.borrow_mut().open_connections -= 1;
    }
}

impl Connection for ScriptedConnection {
    fn load_map(&mut self, _name: &str) -> SimResult<()> {
        record(&self.0, "connection.load_map");
        Ok(())
    }

    fn traffic_coordinator(&mut self) -> SimResult<Box<dyn TrafficCoordinator>> {
        record(&self.0, "connection.traffic_coordinator");
        Ok(Box::new(ScriptedTraffic(self.0.clone())))
    }

    fn world(&mut self) -> SimResult<Box<dyn World>> {
        record(&self.0, "connection.world");
        Ok(Box::new(ScriptedWorld(self.0.clone())))
    }
}

struct ScriptedTraffic(SharedProbe);

impl TrafficCoordinator for ScriptedTraffic {
    fn set_synchronous_mode(&mut self, enabled: bool) -> SimResult<()> {
        record(&self.0, "traffic.set_synchronous_mode");
        ensure_connected(&self.0)?;
        self.0.borrow_mut().traffic_sync = Some(enabled);
        Ok(())
    }
}

struct ScriptedWorld(SharedProbe);

impl ScriptedWorld {
    fn advance(&mut self) -> SimResult<FrameId> {
        let mut probe = self.0.borrow_mut();
        let next = probe.frame + 1;
        if probe.fail_tick_on_frame == Some(next) {
            return Err(SimError::backend("scripted tick failure"));
        }
        probe.frame = next;
        Ok(next)
    }
}

impl World for ScriptedWorld {
    fn settings(&self) -> SimResult<WorldSettings> {
        record(&self.0, "world.settings");
        ensure_connected(&self.0)?;
        Ok(self.0.borrow().settings)
    }

    fn apply_settings(&mut self, settings: &WorldSettings) -> SimResult<()> {
        record(&self.0, "world.apply_settings");
        ensure_connected(&self.0)?;
        self.0.borrow_mut().settings = *settings;
        Ok(())
    }

    fn tick(&mut self) -> SimResult<FrameId> {
        record(&self.0, "world.tick");
        self.advance()
    }

    fn wait_for_tick(&mut self) -> SimResult<FrameId> {
        record(&self.0, "world.wait_for_tick");
        self.advance()
    }

    fn spawn_points(&self) -> SimResult<Vec<Transform>> {
        record(&self.0, "world.spawn_points");
        Ok(spawn_points())
    }

    fn spawn_vehicle(&mut self, at: &Transform) -> SimResult<VehicleHandle> {
        record(&self.0, "world.spawn_vehicle");
        self.0.borrow_mut().vehicle_alive = true;
        Ok(Rc::new(ScriptedVehicle { probe: self.0.clone(), at: *at }))
    }
}

struct ScriptedVehicle {
    probe: SharedProbe,
    at:    Transform,
}

impl Vehicle for ScriptedVehicle {
    fn id(&self) -> ActorId {
        7
    }

    fn state(&self) -> SimResult<VehicleState> {
        record(&self.probe, "vehicle.state");
        Ok(VehicleState { transform: self.at, speed: 0.0 })
    }

    fn apply_control(&self, control: &ControlCommand) -> SimResult<()> {
        record(&self.probe, "vehicle.apply_control");
        self.probe.borrow_mut().controls.push(*control);
        Ok(())
    }

    fn destroy(&self) -> SimResult<()> {
        record(&self.probe, "vehicle.destroy");
        ensure_connected(&self.probe)?;
        self.probe.borrow_mut().vehicle_alive = false;
        Ok(())
    }
}

// ── Local side ─────────────────────────────────────────────────────

struct ScriptedDisplay(SharedProbe);

impl Display for ScriptedDisplay {
    fn draw_text(&mut self, _lines: &[String]) -> SimResult<()> {
        record(&self.0, "display.draw_text");
        Ok(())
    }

    fn present(&mut self) -> SimResult<()> {
        record(&self.0, "display.present");
        Ok(())
    }

    fn shutdown(&mut self) {
        record(&self.0, "display.shutdown");
        self.0.borrow_mut().display_closed = true;
    }
}

struct ScriptedHud(SharedProbe);

impl Hud for ScriptedHud {
    fn tick(&mut self, _clock: &PacingClock, _vehicle: &VehicleState) {
        record(&self.0, "hud.tick");
    }

    fn render(&mut self, display: &mut dyn Display) -> SimResult<()> {
        record(&self.0, "hud.render");
        display.draw_text(&["scripted".to_string()])
    }
}

struct ScriptedInput(SharedProbe);

impl InputHandler for ScriptedInput {
    fn poll_events(&mut self) -> bool {
        record(&self.0, "input.poll_events");
        let probe = self.0.borrow();
        probe.cancel_on_frame.is_some_and(|f| probe.frame >= f)
    }
}

/// Done from a scripted frame on; always asks for manual gears so tests can
/// see the controller override it.
struct ScriptedAgent(SharedProbe);

impl NavigationAgent for ScriptedAgent {
    fn set_destination(&mut self, destination: Location) -> SimResult<()> {
        record(&self.0, "agent.set_destination");
        self.0.borrow_mut().destination = Some(destination);
        Ok(())
    }

    fn is_done(&self) -> SimResult<bool> {
        record(&self.0, "agent.is_done");
        let probe = self.0.borrow();
        Ok(probe.done_from_frame.is_some_and(|f| probe.frame >= f))
    }

    fn run_step(&mut self) -> SimResult<ControlCommand> {
        record(&self.0, "agent.run_step");
        Ok(ControlCommand {
            steer: 0.1,
            throttle: 0.5,
            manual_gear_shift: true,
            gear: 3,
            ..Default::default()
        })
    }
}

pub struct ScriptedPlatform {
    pub probe: SharedProbe,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self { probe: Rc::new(RefCell::new(Probe::default())) }
    }

    pub fn script(&self, f: impl FnOnce(&mut Probe)) {
        f(&mut self.probe.borrow_mut());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.probe.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.probe.borrow_mut().calls.clear();
    }
}

impl Platform for ScriptedPlatform {
    fn connect(&mut self, _endpoint: &Endpoint) -> SimResult<Box<dyn Connection>> {
        record(&self.probe, "platform.connect");
        self.probe.borrow_mut().open_connections += 1;
        Ok(Box::new(ScriptedConnection(self.probe.clone())))
    }

    fn open_display(&mut self, _resolution: Resolution) -> SimResult<Box<dyn Display>> {
        record(&self.probe, "platform.open_display");
        if self.probe.borrow().fail_display {
            return Err(SimError::backend("scripted display failure"));
        }
        Ok(Box::new(ScriptedDisplay(self.probe.clone())))
    }

    fn create_hud(&mut self, _resolution: Resolution) -> Box<dyn Hud> {
        record(&self.probe, "platform.create_hud");
        Box::new(ScriptedHud(self.probe.clone()))
    }

    fn create_input(&mut self) -> Box<dyn InputHandler> {
        record(&self.probe, "platform.create_input");
        Box::new(ScriptedInput(self.probe.clone()))
    }

    fn create_agent(
        &mut self,
        _spec: &AgentSpec,
        _vehicle: VehicleHandle,
    ) -> SimResult<Box<dyn NavigationAgent>> {
        record(&self.probe, "platform.create_agent");
        Ok(Box::new(ScriptedAgent(self.probe.clone())))
    }
}
