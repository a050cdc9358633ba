//! Pursuit agent for the headless server.
//!
//! Steers straight at the destination (the headless maps have no roads
//! to follow), slows down for large heading errors and on approach, and
//! reports done inside `ARRIVAL_RADIUS`.

use crate::{
    agent::{AgentSpec, NavigationAgent},
    config::BehaviorProfile,
    error::SimResult,
    simulator::{ControlCommand, VehicleHandle},
    types::Location,
};
use std::f64::consts::PI;

/// Metres from the destination at which the agent counts as arrived.
pub const ARRIVAL_RADIUS: f64 = 2.0;

const STEER_GAIN: f64 = 2.0;
const SPEED_GAIN: f64 = 0.5;
const MIN_TURN_SPEED_FACTOR: f64 = 0.1;

/// Behavior profile tuning: (max speed km/h, margin below the posted limit km/h).
fn profile_tuning(profile: BehaviorProfile) -> (f64, f64) {
    match profile {
        BehaviorProfile::Cautious   => (40.0, 6.0),
        BehaviorProfile::Normal     => (50.0, 3.0),
        BehaviorProfile::Aggressive => (70.0, -2.0),
    }
}

pub struct PursuitAgent {
    vehicle:     VehicleHandle,
    spec:        AgentSpec,
    destination: Option<Location>,
}

impl PursuitAgent {
    pub fn new(spec: AgentSpec, vehicle: VehicleHandle) -> Self {
        Self { vehicle, spec, destination: None }
    }

    /// Cruising speed for the current position, km/h.
    fn cruise_kmh(&self) -> SimResult<f64> {
        let limit = self.vehicle.speed_limit()?;
        Ok(match self.spec {
            AgentSpec::Basic { target_speed, follow_speed_limits } => {
                match (follow_speed_limits, limit) {
                    (true, Some(limit)) => limit,
                    _ => target_speed,
                }
            }
            AgentSpec::Behavior { profile } => {
                let (max_speed, margin) = profile_tuning(profile);
                match limit {
                    Some(limit) => (limit - margin).min(max_speed).max(5.0),
                    None => max_speed,
                }
            }
        })
    }
}

/// Wrap to (-PI, PI].
fn wrap_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

impl NavigationAgent for PursuitAgent {
    fn set_destination(&mut self, destination: Location) -> SimResult<()> {
        self.destination = Some(destination);
        Ok(())
    }

    fn is_done(&self) -> SimResult<bool> {
        let Some(destination) = self.destination else {
            return Ok(false);
        };
        let here = self.vehicle.state()?.transform.location;
        Ok(here.distance_2d(&destination) < ARRIVAL_RADIUS)
    }

    fn run_step(&mut self) -> SimResult<ControlCommand> {
        let Some(destination) = self.destination else {
            return Ok(ControlCommand { brake: 1.0, ..Default::default() });
        };
        let state = self.vehicle.state()?;
        let here = state.transform.location;
        let distance = here.distance_2d(&destination);

        let bearing = (destination.y - here.y).atan2(destination.x - here.x);
        let error = wrap_angle(bearing - state.transform.rotation.yaw.to_radians());

        let cruise = self.cruise_kmh()? / 3.6;
        let desired = (cruise * error.cos().max(MIN_TURN_SPEED_FACTOR)).min(0.5 * distance + 0.5);
        let speed_error = desired - state.speed;

        Ok(ControlCommand {
            steer:    (error * STEER_GAIN).clamp(-1.0, 1.0),
            throttle: (speed_error * SPEED_GAIN).clamp(0.0, 1.0),
            brake:    (-speed_error * SPEED_GAIN).clamp(0.0, 1.0),
            ..Default::default()
        })
    }
}
