//! Headless reference platform.
//!
//! Implements every collaborator the controller needs without a real
//! simulator or window: an in-process server, a pursuit agent, a text HUD
//! on an off-screen display, and input driven by a `CancelToken`. Used by
//! `drive-runner` and by the integration tests.

pub mod frontend;
pub mod navigation;
pub mod server;

use crate::{
    agent::{AgentSpec, NavigationAgent},
    config::{Endpoint, Resolution},
    driver::CancelToken,
    error::{SimError, SimResult},
    frontend::{Display, Hud, InputHandler, Platform},
    simulator::{Connection, VehicleHandle},
};
use frontend::{FrontendStats, HeadlessDisplay, TextHud, TokenInput};
use navigation::PursuitAgent;
use server::HeadlessSimulator;
use std::{cell::RefCell, rc::Rc};

pub struct HeadlessPlatform {
    simulator:    HeadlessSimulator,
    cancel:       CancelToken,
    stats:        Rc<RefCell<FrontendStats>>,
    fail_display: bool,
    log_every:    u64,
}

impl HeadlessPlatform {
    pub fn new(simulator: HeadlessSimulator, cancel: CancelToken) -> Self {
        Self {
            simulator,
            cancel,
            stats: Rc::new(RefCell::new(FrontendStats::default())),
            fail_display: false,
            log_every: 20,
        }
    }

    /// Make `open_display` fail, for exercising init rollback.
    pub fn with_failing_display(mut self) -> Self {
        self.fail_display = true;
        self
    }

    /// Log the HUD overlay every `n` presented frames (0 = never).
    pub fn with_overlay_log_every(mut self, n: u64) -> Self {
        self.log_every = n;
        self
    }

    pub fn simulator(&self) -> &HeadlessSimulator {
        &self.simulator
    }

    pub fn frontend_stats(&self) -> FrontendStats {
        self.stats.borrow().clone()
    }
}

impl Platform for HeadlessPlatform {
    fn connect(&mut self, endpoint: &Endpoint) -> SimResult<Box<dyn Connection>> {
        Ok(Box::new(self.simulator.connect(endpoint)?))
    }

    fn open_display(&mut self, resolution: Resolution) -> SimResult<Box<dyn Display>> {
        if self.fail_display {
            return Err(SimError::backend(format!("cannot open a {resolution} display")));
        }
        Ok(Box::new(HeadlessDisplay::open(resolution, self.log_every, self.stats.clone())))
    }

    fn create_hud(&mut self, resolution: Resolution) -> Box<dyn Hud> {
        Box::new(TextHud::new(resolution))
    }

    fn create_input(&mut self) -> Box<dyn InputHandler> {
        Box::new(TokenInput::new(self.cancel.clone()))
    }

    fn create_agent(
        &mut self,
        spec: &AgentSpec,
        vehicle: VehicleHandle,
    ) -> SimResult<Box<dyn NavigationAgent>> {
        Ok(Box::new(PursuitAgent::new(*spec, vehicle)))
    }
}
