//! # Chassis Executable Parameters
//!
//! This module provides parameters for the chassis executable, loaded from `chassis_exec.toml`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::HashSet, time::Duration};

use serde::Deserialize;

use crate::{
    chassis_ctrl::{self, ChassisCtrlError},
    motor_ctrl::{self, MotorCtrlError},
    remote_ctrl::{MAX_KEY, MIN_KEY},
    sim::{SimChassisParams, SimMotorParams},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisExecParams {
    pub tasks: TaskParams,

    pub channels: ChannelParams,

    pub remote: RemoteParams,

    pub motor: motor_ctrl::Params,

    pub chassis: chassis_ctrl::Params,

    pub sim: SimParams,
}

/// Timing of the executable's tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskParams {
    /// Period of the message polling task
    pub msg_period_ms: u64,

    /// Period of the motor control task
    pub motor_period_ms: u64,

    /// Period of the chassis control task
    pub chassis_period_ms: u64,

    /// How long the motor task waits for a new target angle each cycle
    pub motor_queue_timeout_ms: u64,

    /// Period between status lines from the supervisor
    pub status_log_period_ms: u64,
}

/// Endpoints of the links to the peers.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelParams {
    /// Endpoint of the remote control receiver link
    pub remote_endpoint: String,

    /// Endpoint of the main board link
    pub main_board_endpoint: String,

    /// Limit on how long a single write may block
    pub write_timeout_ms: u64,
}

/// Remote key bindings which aren't motor targets.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteParams {
    /// Key which switches to manual mode
    pub manual_key: u8,

    /// Key which switches to autonomous mode
    pub auto_key: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    pub chassis: SimChassisParams,
    pub motor: SimMotorParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Task period {0} must be greater than zero")]
    ZeroPeriod(&'static str),

    #[error("Key {0} bound to {1} is outside the remote's key range")]
    KeyOutOfRange(u8, &'static str),

    #[error("Key {0} is bound more than once")]
    DuplicateKey(u8),

    #[error("Invalid chassis parameters: {0}")]
    Chassis(#[from] ChassisCtrlError),

    #[error("Invalid motor parameters: {0}")]
    Motor(#[from] MotorCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisExecParams {
    /// Check the parameters are consistent.
    ///
    /// The simulation parameters are checked when the models are built.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        let periods = [
            ("msg_period_ms", self.tasks.msg_period_ms),
            ("motor_period_ms", self.tasks.motor_period_ms),
            ("chassis_period_ms", self.tasks.chassis_period_ms),
            ("status_log_period_ms", self.tasks.status_log_period_ms),
        ];
        for (name, period) in periods.iter() {
            if *period == 0 {
                return Err(ParamsError::ZeroPeriod(*name));
            }
        }

        // Every key may only do one thing
        let mut keys = HashSet::new();
        let bindings = self
            .motor
            .key_targets
            .iter()
            .map(|t| (t.key, "a motor target"))
            .chain(std::iter::once((self.remote.manual_key, "manual mode")))
            .chain(std::iter::once((self.remote.auto_key, "auto mode")));

        for (key, action) in bindings {
            if !(MIN_KEY..=MAX_KEY).contains(&key) {
                return Err(ParamsError::KeyOutOfRange(key, action));
            }
            if !keys.insert(key) {
                return Err(ParamsError::DuplicateKey(key));
            }
        }

        self.motor.validate()?;
        self.chassis.validate()?;

        Ok(())
    }
}

impl TaskParams {
    pub fn msg_period(&self) -> Duration {
        Duration::from_millis(self.msg_period_ms)
    }

    pub fn motor_period(&self) -> Duration {
        Duration::from_millis(self.motor_period_ms)
    }

    pub fn chassis_period(&self) -> Duration {
        Duration::from_millis(self.chassis_period_ms)
    }

    pub fn motor_queue_timeout(&self) -> Duration {
        Duration::from_millis(self.motor_queue_timeout_ms)
    }

    pub fn status_log_period(&self) -> Duration {
        Duration::from_millis(self.status_log_period_ms)
    }
}

impl ChannelParams {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chassis_ctrl::ChassisMode;

    const PARAMS_STR: &str = include_str!("../../params/chassis_exec.toml");

    fn params() -> ChassisExecParams {
        util::params::from_str(PARAMS_STR).unwrap()
    }

    #[test]
    fn test_shipped_params() {
        let p = params();
        assert!(p.are_valid().is_ok());

        assert_eq!(p.tasks.chassis_period(), Duration::from_millis(10));
        assert_eq!(p.chassis.initial_mode, ChassisMode::Auto);
        assert_eq!(p.remote.manual_key, 15);
        assert_eq!(p.remote.auto_key, 16);
        assert_eq!(p.sim.chassis.storage_slots.len(), 6);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.tasks.motor_period_ms = 0;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::ZeroPeriod("motor_period_ms"))
        ));

        let mut p = params();
        p.remote.auto_key = p.remote.manual_key;
        assert!(matches!(p.are_valid(), Err(ParamsError::DuplicateKey(15))));

        let mut p = params();
        p.remote.manual_key = 19;
        assert!(matches!(
            p.are_valid(),
            Err(ParamsError::KeyOutOfRange(19, _))
        ));

        let mut p = params();
        p.chassis.route.clear();
        assert!(matches!(p.are_valid(), Err(ParamsError::Chassis(_))));
    }
}
