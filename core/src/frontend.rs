//! Local-side collaborators: display, HUD, input, and the platform
//! factory that builds them together with the server connection and the
//! navigation agent.

use crate::{
    agent::{AgentSpec, NavigationAgent},
    clock::PacingClock,
    config::{Endpoint, Resolution},
    error::SimResult,
    simulator::{Connection, VehicleHandle, VehicleState},
};

/// A window or off-screen surface the HUD draws into.
pub trait Display {
    /// Blit overlay text for the frame being built.
    fn draw_text(&mut self, lines: &[String]) -> SimResult<()>;

    /// Flip the finished frame to the screen.
    fn present(&mut self) -> SimResult<()>;

    /// Release the surface. Called once, during teardown.
    fn shutdown(&mut self);
}

/// Overlay of session state.
pub trait Hud {
    /// Per-tick bookkeeping: timing and vehicle metrics.
    fn tick(&mut self, clock: &PacingClock, vehicle: &VehicleState);

    /// Draw the current overlay onto `display`.
    fn render(&mut self, display: &mut dyn Display) -> SimResult<()>;
}

pub trait InputHandler {
    /// Drain pending input events. Returns true if the user asked to quit.
    fn poll_events(&mut self) -> bool;
}

/// Builds every external collaborator the session needs.
pub trait Platform {
    fn connect(&mut self, endpoint: &Endpoint) -> SimResult<Box<dyn Connection>>;

    fn open_display(&mut self, resolution: Resolution) -> SimResult<Box<dyn Display>>;

    fn create_hud(&mut self, resolution: Resolution) -> Box<dyn Hud>;

    fn create_input(&mut self) -> Box<dyn InputHandler>;

    fn create_agent(
        &mut self,
        spec: &AgentSpec,
        vehicle: VehicleHandle,
    ) -> SimResult<Box<dyn NavigationAgent>>;
}
