//! # Chassis library.
//!
//! This library allows the executable, and any tools built alongside it, to access the chassis
//! control modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Chassis control module - autonomous navigation state machine and manual driving
pub mod chassis_ctrl;

/// Motion primitives the chassis is driven through
pub mod motion;

/// Motor control module - cascaded angle and speed loops on a single motor
pub mod motor_ctrl;

/// Executable parameters
pub mod params;

/// PID controller used by every closed loop
pub mod pid;

/// Remote control - decodes remote reports and dispatches key presses
pub mod remote_ctrl;

/// Simulated chassis and motor, used in place of the hardware on a host
pub mod sim;

/// Cyclic task runners
pub mod tasks;
