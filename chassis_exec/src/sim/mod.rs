//! # Simulation module
//!
//! Simple models standing in for the chassis and motor hardware when running on a host. They are
//! good enough to exercise the control loops end to end, not to tune them.
//!
//! - [`SimChassis`] is a point mass with one PID per axis, implementing the motion primitives.
//! - [`SimMotor`] is a first order motor model implementing the motor bus.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chassis;
mod motor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use chassis::*;
pub use motor::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(String),
}
