//! Parameters structure for MotorCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::MotorCtrlError;
use crate::pid::{PidMode, PidParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motor control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Outer loop, angle error (degrees) to speed demand (rpm)
    pub angle_pid: PidParams,

    /// Inner loop, speed error (rpm) to current demand
    pub speed_pid: PidParams,

    /// Remote keys and the target angle each selects
    pub key_targets: Vec<KeyTarget>,
}

/// A remote key bound to a target angle.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct KeyTarget {
    pub key: u8,

    /// Units: degrees
    pub angle_deg: f32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), MotorCtrlError> {
        if !self.angle_pid.are_valid() {
            return Err(MotorCtrlError::InvalidParams("angle"));
        }
        if !self.speed_pid.are_valid() {
            return Err(MotorCtrlError::InvalidParams("speed"));
        }

        Ok(())
    }
}

impl Default for Params {
    /// Gains tuned for the M2006 motor.
    fn default() -> Self {
        Self {
            angle_pid: PidParams {
                max_output: 16384.0,
                integral_limit: 5000.0,
                deadband: 30.0,
                max_error: 8000.0,
                mode: PidMode::Position,
                kp: 8.0,
                ki: 0.001,
                kd: 0.0,
            },
            speed_pid: PidParams {
                max_output: 8192.0,
                integral_limit: 8192.0,
                deadband: 30.0,
                max_error: 8000.0,
                mode: PidMode::Position,
                kp: 6.0,
                ki: 0.001,
                kd: 0.2,
            },
            key_targets: vec![
                KeyTarget {
                    key: 1,
                    angle_deg: 90.0,
                },
                KeyTarget {
                    key: 2,
                    angle_deg: 180.0,
                },
                KeyTarget {
                    key: 3,
                    angle_deg: -90.0,
                },
            ],
        }
    }
}
