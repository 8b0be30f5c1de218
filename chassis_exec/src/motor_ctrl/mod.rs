//! # Motor control module
//!
//! Closes a cascaded loop on a single motor: an angle loop turns the target angle into a speed
//! demand, and a speed loop turns that into a current demand written to the motor bus.
//!
//! Target angles arrive from the remote's key callbacks through a bounded queue. When no new
//! target arrives the previous one is held.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The bus a motor is driven and sensed through.
pub trait MotorBus {
    /// Rotor angle in degrees.
    fn rotor_degree(&self) -> f32;

    /// Rotor speed in rpm.
    fn speed_rpm(&self) -> f32;

    /// Command the motor current, in bus units.
    fn set_current(&mut self, current: i16);
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MotorCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MotorCtrlError {
    #[error("Invalid {0} loop parameters")]
    InvalidParams(&'static str),
}
