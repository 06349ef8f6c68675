//! # Configuration
//!
//! Controller configuration sourced from the environment.

mod controller;

pub use controller::ControllerConfig;
