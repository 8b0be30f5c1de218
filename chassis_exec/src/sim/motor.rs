//! Simulated motor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::SimError;
use crate::motor_ctrl::MotorBus;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Degrees per second for each rpm.
const DEG_S_PER_RPM: f32 = 6.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated motor.
#[derive(Debug, Clone, Deserialize)]
pub struct SimMotorParams {
    /// Time simulated by each current command, normally the motor cycle period
    ///
    /// Units: seconds
    pub step_s: f32,

    /// Time constant of the speed response
    ///
    /// Units: seconds
    pub time_constant_s: f32,

    /// Steady state speed for each unit of current
    ///
    /// Units: rpm
    pub rpm_per_current: f32,
}

/// First order motor: speed lags the current demand, angle integrates speed.
pub struct SimMotor {
    params: SimMotorParams,

    rotor_degree: f32,
    speed_rpm: f32,
    current: i16,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimMotor {
    pub fn new(params: SimMotorParams) -> Result<Self, SimError> {
        if params.step_s <= 0.0 || params.time_constant_s < params.step_s {
            return Err(SimError::InvalidParams(
                "motor time constant must be at least one positive step".into(),
            ));
        }

        Ok(Self {
            params,
            rotor_degree: 0.0,
            speed_rpm: 0.0,
            current: 0,
        })
    }

    pub fn current(&self) -> i16 {
        self.current
    }
}

impl MotorBus for SimMotor {
    fn rotor_degree(&self) -> f32 {
        self.rotor_degree
    }

    fn speed_rpm(&self) -> f32 {
        self.speed_rpm
    }

    fn set_current(&mut self, current: i16) {
        let dt = self.params.step_s;
        let target_rpm = current as f32 * self.params.rpm_per_current;

        self.current = current;
        self.speed_rpm += (target_rpm - self.speed_rpm) * dt / self.params.time_constant_s;
        self.rotor_degree += self.speed_rpm * DEG_S_PER_RPM * dt;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> SimMotorParams {
        SimMotorParams {
            step_s: 0.005,
            time_constant_s: 0.05,
            rpm_per_current: 0.5,
        }
    }

    #[test]
    fn test_step_response() {
        let mut motor = SimMotor::new(params()).unwrap();

        motor.set_current(1000);
        // One step covers a tenth of the way to 500 rpm
        assert!((motor.speed_rpm() - 50.0).abs() < 1e-3);
        assert!((motor.rotor_degree() - 1.5).abs() < 1e-3);

        for _ in 0..200 {
            motor.set_current(1000);
        }
        assert!((motor.speed_rpm() - 500.0).abs() < 1.0);
        assert_eq!(motor.current(), 1000);

        // Zero current coasts down
        for _ in 0..200 {
            motor.set_current(0);
        }
        assert!(motor.speed_rpm().abs() < 1.0);
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.time_constant_s = 0.001;
        assert!(SimMotor::new(p).is_err());
    }
}
