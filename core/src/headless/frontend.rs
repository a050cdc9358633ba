//! Text HUD, off-screen display and token-backed input for headless runs.

use crate::{
    clock::PacingClock,
    config::Resolution,
    driver::CancelToken,
    error::{SimError, SimResult},
    frontend::{Display, Hud, InputHandler},
    simulator::VehicleState,
};
use std::{cell::RefCell, rc::Rc};

/// Counters shared between the platform and every display it opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontendStats {
    pub displays_opened:  u32,
    pub displays_closed:  u32,
    pub frames_presented: u64,
    /// Overlay of the last presented frame.
    pub last_overlay:     Vec<String>,
}

pub struct TextHud {
    resolution: Resolution,
    lines:      Vec<String>,
}

impl TextHud {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, lines: Vec::new() }
    }
}

impl Hud for TextHud {
    fn tick(&mut self, clock: &PacingClock, vehicle: &VehicleState) {
        let loc = vehicle.transform.location;
        self.lines = vec![
            format!("Client:  {:5.1} FPS", clock.fps()),
            format!("Frame:   {}", clock.frames()),
            format!("Speed:   {:5.1} km/h", vehicle.speed_kmh()),
            format!("Heading: {:5.1}", vehicle.transform.rotation.yaw),
            format!("Location: ({:7.1}, {:7.1})", loc.x, loc.y),
            format!("Display: {}", self.resolution),
        ];
    }

    fn render(&mut self, display: &mut dyn Display) -> SimResult<()> {
        display.draw_text(&self.lines)
    }
}

pub struct HeadlessDisplay {
    resolution: Resolution,
    buffer:     Vec<String>,
    closed:     bool,
    log_every:  u64,
    stats:      Rc<RefCell<FrontendStats>>,
}

impl HeadlessDisplay {
    pub(crate) fn open(
        resolution: Resolution,
        log_every: u64,
        stats: Rc<RefCell<FrontendStats>>,
    ) -> Self {
        stats.borrow_mut().displays_opened += 1;
        log::debug!("headless: display opened at {resolution}");
        Self { resolution, buffer: Vec::new(), closed: false, log_every, stats }
    }

    fn ensure_open(&self) -> SimResult<()> {
        if self.closed {
            return Err(SimError::backend(format!("display {} already shut down", self.resolution)));
        }
        Ok(())
    }
}

impl Display for HeadlessDisplay {
    fn draw_text(&mut self, lines: &[String]) -> SimResult<()> {
        self.ensure_open()?;
        self.buffer = lines.to_vec();
        Ok(())
    }

    fn present(&mut self) -> SimResult<()> {
        self.ensure_open()?;
        let mut stats = self.stats.borrow_mut();
        stats.frames_presented += 1;
        stats.last_overlay = std::mem::take(&mut self.buffer);
        if self.log_every > 0 && stats.frames_presented % self.log_every == 0 {
            log::debug!("{}", stats.last_overlay.join(" | "));
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stats.borrow_mut().displays_closed += 1;
        }
    }
}

/// Reports a quit request once the token is cancelled.
pub struct TokenInput {
    token: CancelToken,
}

impl TokenInput {
    pub fn new(token: CancelToken) -> Self {
        Self { token }
    }
}

impl InputHandler for TokenInput {
    fn poll_events(&mut self) -> bool {
        self.token.is_cancelled()
    }
}
