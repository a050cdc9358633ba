//! The outer session loop.
//!
//! `run_session` owns the controller for the whole run, so `destroy()` runs
//! exactly once whichever way the loop ends: arrival, user cancel, tick
//! budget, or a step error.

use crate::{
    controller::{SimulationController, StepOutcome, TeardownReport},
    error::SimResult,
    event::SessionEvent,
    types::Tick,
};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// Cooperative cancellation flag. Clones share the flag, so it can be
/// handed to an input watcher thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Arrived,
    Cancelled,
    TickBudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome:        SessionOutcome,
    pub ticks:          Tick,
    /// Simulated seconds, known only in synchronous mode.
    pub sim_seconds:    Option<f64>,
    pub wall:           Duration,
    pub final_distance: Option<f64>,
    pub teardown:       TeardownReport,
    /// Full event log, teardown included.
    pub events:         Vec<SessionEvent>,
}

/// Step `controller` until it reaches a terminal state, then destroy it.
///
/// The token is checked at the top of every tick; `max_ticks` bounds the
/// run when set. A step error ends the loop and is returned after teardown.
pub fn run_session(
    mut controller: SimulationController,
    cancel: &CancelToken,
    max_ticks: Option<Tick>,
) -> SimResult<SessionReport> {
    let result = loop {
        if cancel.is_cancelled() {
            break controller.cancel().map(|()| SessionOutcome::Cancelled);
        }
        if max_ticks.is_some_and(|max| controller.ticks() >= max) {
            log::warn!("Tick budget of {} exhausted before arrival", controller.ticks());
            break Ok(SessionOutcome::TickBudgetExhausted);
        }
        match controller.step() {
            Ok(StepOutcome::Continue)  => continue,
            Ok(StepOutcome::Arrived)   => break Ok(SessionOutcome::Arrived),
            Ok(StepOutcome::Cancelled) => break Ok(SessionOutcome::Cancelled),
            Err(e) => break Err(e),
        }
    };

    let ticks = controller.ticks();
    let sim_seconds = controller.mode().fixed_delta().map(|dt| dt * ticks as f64);
    let wall = controller.wall_elapsed().unwrap_or_default();
    let final_distance = controller.distance_to_destination();
    let teardown = controller.destroy();

    Ok(SessionReport {
        outcome: result?,
        ticks,
        sim_seconds,
        wall,
        final_distance,
        teardown,
        events: controller.events().to_vec(),
    })
}
