#![forbid(unsafe_code)]

//! Headless driver for the barrage engine.
//!
//! Generates or loads an item stream, runs it frame by frame through
//! [`barrage_runtime::Engine`] against a [`KinematicRenderer`], and reports
//! admissions, drops, delays and any lane overlap.

pub mod cli;
pub mod error;
pub mod renderer;
pub mod scenario;
pub mod sim;

pub use cli::run_from_env;
pub use error::{Result, SimError};
pub use renderer::{KinematicRenderer, Overlap};
pub use scenario::{Delivery, Scenario, StreamSpec};
pub use sim::{SimOptions, SimReport, run};
