//! The simulation controller: session lifecycle and the per-tick loop.
//!
//! LIFECYCLE:
//!   init    → Running
//!   step    → Running | Arrived | Cancelled | Failed
//!   cancel  → Cancelled (between ticks, from Running only)
//!   destroy → Destroyed (from any phase, exactly once)
//!
//! STEP ORDER (fixed, documented, never reordered):
//!   1. Pacing clock tick
//!   2. Advance simulated time (the only wait on the server)
//!   3. Poll input; a cancel request ends the tick here
//!   4. Scene + HUD bookkeeping
//!   5. Render and present
//!   6. Arrival check; arrival ends the tick with no new control
//!   7. Compute control, force automatic gears, apply to the vehicle
//!
//! RULES:
//!   - Only the controller touches connection, world and display handles.
//!   - The agent sees the vehicle handle and the destination, nothing else.
//!   - Server settings are restored before the connection is dropped, on
//!     every exit path, including a failed init.

use crate::{
    agent::NavigationAgent,
    clock::PacingClock,
    config::SimulationConfig,
    error::{SimError, SimResult},
    event::SessionEvent,
    frontend::{Display, InputHandler, Platform},
    rng::SimRng,
    scene::Scene,
    simulator::{Connection, TrafficCoordinator, World, WorldSettings},
    time_stepping::TimeSteppingMode,
    types::{FrameId, Location, Tick},
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Running,
    Arrived,
    Cancelled,
    /// A step returned an error. Terminal for stepping, like Arrived.
    Failed,
    Destroyed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running   => "running",
            Self::Arrived   => "arrived",
            Self::Cancelled => "cancelled",
            Self::Failed    => "failed",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Result of one `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The agent reported the destination reached.
    Arrived,
    /// The user asked to stop. Not an arrival.
    Cancelled,
}

impl StepOutcome {
    /// True only for arrival.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Arrived)
    }

    /// True for every outcome after which `step()` must not be called again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// What happened while tearing a session down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeardownReport {
    pub settings_restored: bool,
    /// Failures that were logged and swallowed.
    pub warnings: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }
}

// ── Session resources ──────────────────────────────────────────────

/// Everything that must be released on teardown, possibly half-built.
#[derive(Default)]
struct SessionResources {
    connection:        Option<Box<dyn Connection>>,
    traffic:           Option<Box<dyn TrafficCoordinator>>,
    world:             Option<Box<dyn World>>,
    previous_settings: Option<WorldSettings>,
    display:           Option<Box<dyn Display>>,
    scene:             Option<Scene>,
}

impl SessionResources {
    /// Restore server settings, destroy actors, shut the display, drop the
    /// connection. Each stage runs even if an earlier one failed.
    fn release(mut self, mode: TimeSteppingMode) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let (Some(world), Some(traffic)) = (self.world.as_deref_mut(), self.traffic.as_deref_mut()) {
            match mode.release(world, traffic, self.previous_settings.take()) {
                Ok(()) => report.settings_restored = true,
                Err(e) => report.warn(format!("Could not restore server settings: {e}")),
            }
        }

        if let Some(mut scene) = self.scene.take() {
            if let Err(e) = scene.destroy() {
                report.warn(format!("Could not destroy actors: {e}"));
            }
        }

        if let Some(mut display) = self.display.take() {
            display.shutdown();
        }

        // World and traffic handles go before the connection they came from.
        drop(self.world.take());
        drop(self.traffic.take());
        drop(self.connection.take());
        report
    }

    fn into_session(
        self,
        input: Box<dyn InputHandler>,
        agent: Box<dyn NavigationAgent>,
        destination: Location,
    ) -> Result<Session, Self> {
        match self {
            SessionResources {
                connection: Some(connection),
                traffic: Some(traffic),
                world: Some(world),
                previous_settings,
                display: Some(display),
                scene: Some(scene),
            } => Ok(Session {
                connection,
                traffic,
                world,
                previous_settings,
                display,
                scene,
                input,
                agent,
                destination,
                clock: PacingClock::start(),
            }),
            incomplete => Err(incomplete),
        }
    }
}

/// A fully built session. Owned exclusively by the controller.
struct Session {
    connection:        Box<dyn Connection>,
    traffic:           Box<dyn TrafficCoordinator>,
    world:             Box<dyn World>,
    previous_settings: Option<WorldSettings>,
    display:           Box<dyn Display>,
    scene:             Scene,
    input:             Box<dyn InputHandler>,
    agent:             Box<dyn NavigationAgent>,
    destination:       Location,
    clock:             PacingClock,
}

impl Session {
    fn run_tick(
        &mut self,
        mode: TimeSteppingMode,
        tick: Tick,
        events: &mut Vec<SessionEvent>,
    ) -> SimResult<(StepOutcome, FrameId)> {
        self.clock.tick();
        let frame = mode.advance(self.world.as_mut())?;

        if self.input.poll_events() {
            log::info!("Cancel requested at tick {tick}");
            events.push(SessionEvent::Cancelled { tick });
            return Ok((StepOutcome::Cancelled, frame));
        }

        self.scene.tick(&self.clock)?;
        self.scene.render(self.display.as_mut())?;
        self.display.present()?;

        if self.agent.is_done()? {
            log::info!("The target has been reached at tick {tick}");
            events.push(SessionEvent::Arrived { tick, frame });
            return Ok((StepOutcome::Arrived, frame));
        }

        let mut control = self.agent.run_step()?;
        control.manual_gear_shift = false;
        self.scene.vehicle().apply_control(&control)?;
        log::debug!(
            "tick={tick} frame={frame} steer={:.3} throttle={:.3} brake={:.3}",
            control.steer,
            control.throttle,
            control.brake
        );
        events.push(SessionEvent::ControlApplied { tick, frame, control });
        Ok((StepOutcome::Continue, frame))
    }

    fn into_resources(self) -> SessionResources {
        SessionResources {
            connection:        Some(self.connection),
            traffic:           Some(self.traffic),
            world:             Some(self.world),
            previous_settings: self.previous_settings,
            display:           Some(self.display),
            scene:             Some(self.scene),
        }
    }
}

// ── Controller ─────────────────────────────────────────────────────

pub struct SimulationController {
    phase:      SessionPhase,
    mode:       TimeSteppingMode,
    session:    Option<Session>,
    tick:       Tick,
    last_frame: FrameId,
    events:     Vec<SessionEvent>,
}

impl SimulationController {
    /// Bring up a session, seeding the generator from `config.seed`.
    pub fn init(config: &SimulationConfig, platform: &mut dyn Platform) -> SimResult<Self> {
        Self::init_with_rng(config, platform, SimRng::from_seed(config.seed))
    }

    /// Bring up a session with an explicit generator.
    ///
    /// On error nothing stays reachable: settings that were changed are
    /// restored and everything opened so far is released before returning.
    pub fn init_with_rng(
        config: &SimulationConfig,
        platform: &mut dyn Platform,
        mut rng: SimRng,
    ) -> SimResult<Self> {
        let mode = config.time_stepping;
        let mut events = vec![SessionEvent::SessionStarted {
            map:  config.map.clone(),
            seed: rng.seed(),
            mode,
        }];

        let mut res = SessionResources::default();
        match Self::bring_up(config, platform, &mut rng, &mut res, &mut events) {
            Ok((input, agent, destination)) => match res.into_session(input, agent, destination) {
                Ok(session) => Ok(Self {
                    phase: SessionPhase::Running,
                    mode,
                    session: Some(session),
                    tick: 0,
                    last_frame: 0,
                    events,
                }),
                Err(res) => {
                    res.release(mode);
                    Err(SimError::backend("session bring-up left resources unset"))
                }
            },
            Err(e) => {
                log::error!("Session init failed: {e}");
                res.release(mode);
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn bring_up(
        config: &SimulationConfig,
        platform: &mut dyn Platform,
        rng: &mut SimRng,
        res: &mut SessionResources,
        events: &mut Vec<SessionEvent>,
    ) -> SimResult<(Box<dyn InputHandler>, Box<dyn NavigationAgent>, Location)> {
        log::debug!("Connecting to {} (timeout {:?})", config.endpoint, config.endpoint.timeout);
        let connection = res.connection.insert(platform.connect(&config.endpoint)?);
        connection.load_map(&config.map)?;
        let traffic = res.traffic.insert(connection.traffic_coordinator()?);
        let world = res.world.insert(connection.world()?);

        res.previous_settings = config.time_stepping.engage(world.as_mut(), traffic.as_mut())?;

        res.display = Some(platform.open_display(config.resolution)?);

        let hud = platform.create_hud(config.resolution);
        let scene = res.scene.insert(Scene::spawn(world.as_mut(), hud, rng)?);
        events.push(SessionEvent::VehicleSpawned {
            actor_id: scene.vehicle().id(),
            at:       scene.vehicle_state().transform,
        });
        let input = platform.create_input();

        let mut agent = platform.create_agent(&config.agent, scene.vehicle())?;

        let candidates = scene.spawn_points();
        let destination = rng
            .choose(candidates)
            .map(|t| t.location)
            .ok_or_else(|| SimError::backend("map has no spawn points"))?;
        events.push(SessionEvent::DestinationChosen {
            location:        destination,
            candidate_count: candidates.len(),
        });
        log::info!(
            "Destination set to ({:.1}, {:.1}, {:.1})",
            destination.x,
            destination.y,
            destination.z
        );
        agent.set_destination(destination)?;

        Ok((input, agent, destination))
    }

    /// Advance the session by exactly one tick.
    pub fn step(&mut self) -> SimResult<StepOutcome> {
        let Some(session) = self.session.as_mut().filter(|_| self.phase == SessionPhase::Running) else {
            return Err(SimError::InvalidPhase { phase: self.phase, action: "step" });
        };

        let tick = self.tick + 1;
        self.tick = tick;
        match session.run_tick(self.mode, tick, &mut self.events) {
            Ok((outcome, frame)) => {
                self.last_frame = frame;
                self.phase = match outcome {
                    StepOutcome::Continue  => SessionPhase::Running,
                    StepOutcome::Arrived   => SessionPhase::Arrived,
                    StepOutcome::Cancelled => SessionPhase::Cancelled,
                };
                Ok(outcome)
            }
            Err(e) => {
                log::error!("tick={tick} step failed: {e}");
                self.phase = SessionPhase::Failed;
                Err(e)
            }
        }
    }

    /// Record a cancel request that arrived between ticks, e.g. from a
    /// cancel token checked by the outer loop. Only valid while Running.
    pub fn cancel(&mut self) -> SimResult<()> {
        if self.phase != SessionPhase::Running {
            return Err(SimError::InvalidPhase { phase: self.phase, action: "cancel" });
        }
        log::info!("Cancel requested after tick {}", self.tick);
        self.events.push(SessionEvent::Cancelled { tick: self.tick });
        self.phase = SessionPhase::Cancelled;
        Ok(())
    }

    /// Restore server state and release every resource. Runs its body once;
    /// later calls return an empty report.
    pub fn destroy(&mut self) -> TeardownReport {
        if self.phase == SessionPhase::Destroyed {
            return TeardownReport::default();
        }

        let report = match self.session.take() {
            Some(session) => session.into_resources().release(self.mode),
            None => TeardownReport::default(),
        };

        if report.settings_restored {
            self.events.push(SessionEvent::SettingsRestored);
        }
        for message in &report.warnings {
            self.events.push(SessionEvent::TeardownWarning { message: message.clone() });
        }
        self.events.push(SessionEvent::SessionDestroyed { ticks: self.tick });
        self.phase = SessionPhase::Destroyed;
        log::info!("Session destroyed after {} ticks", self.tick);
        report
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> TimeSteppingMode {
        self.mode
    }

    /// Number of `step()` calls so far.
    pub fn ticks(&self) -> Tick {
        self.tick
    }

    /// Server frame reported by the last successful step.
    pub fn last_frame(&self) -> FrameId {
        self.last_frame
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// None after destroy.
    pub fn destination(&self) -> Option<Location> {
        self.session.as_ref().map(|s| s.destination)
    }

    /// Planar distance from the vehicle (as of the last tick) to the destination.
    pub fn distance_to_destination(&self) -> Option<f64> {
        self.session.as_ref().map(|s| {
            s.scene
                .vehicle_state()
                .transform
                .location
                .distance_2d(&s.destination)
        })
    }

    /// Wall time since the pacing clock started.
    pub fn wall_elapsed(&self) -> Option<std::time::Duration> {
        self.session.as_ref().map(|s| s.clock.elapsed())
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        if self.phase != SessionPhase::Destroyed {
            log::warn!("Session dropped without destroy(); tearing down now");
            self.destroy();
        }
    }
}
