//! autopilot-core: session controller for driving a vehicle inside an
//! external simulator with a navigation agent.
//!
//! The controller (`controller`) is the only piece with its own logic. It
//! talks to the server through `simulator`, to the local side through
//! `frontend`, and to the agent through `agent`. `headless` implements all
//! of those in-process.

pub mod agent;
pub mod clock;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod event;
pub mod frontend;
pub mod headless;
pub mod rng;
pub mod scene;
pub mod simulator;
pub mod time_stepping;
pub mod types;
