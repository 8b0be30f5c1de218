//! Implementations for the MotorCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{MotorBus, MotorCtrlError, Params};
use crate::pid::Pid;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motor control module state
pub struct MotorCtrl {
    angle_pid: Pid,
    speed_pid: Pid,

    /// Angle currently held, degrees
    target_angle_deg: f32,
}

/// Input data to motor control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// New target angle in degrees, or `None` to hold the previous one
    pub target_angle_deg: Option<f32>,

    /// Measured rotor angle in degrees
    pub rotor_degree: f32,

    /// Measured rotor speed in rpm
    pub speed_rpm: f32,
}

/// Output of motor control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputData {
    /// Current demand for the motor bus
    pub current: i16,
}

/// Status report for motor control processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusReport {
    pub target_angle_deg: f32,

    /// Output of the angle loop
    pub speed_demand_rpm: f32,

    /// Output of the speed loop before conversion to bus units
    pub current_demand: f32,

    /// True if the speed loop output was at its limit
    pub current_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorCtrl {
    pub fn new(params: &Params) -> Result<Self, MotorCtrlError> {
        params.validate()?;

        Ok(Self {
            angle_pid: Pid::new(params.angle_pid),
            speed_pid: Pid::new(params.speed_pid),
            target_angle_deg: 0.0,
        })
    }

    pub fn target_angle_deg(&self) -> f32 {
        self.target_angle_deg
    }

    /// Run one cycle against a motor bus: sense, process, and write the current demand.
    pub fn drive<B: MotorBus>(
        &mut self,
        bus: &mut B,
        target_angle_deg: Option<f32>,
    ) -> Result<StatusReport, MotorCtrlError> {
        let input = InputData {
            target_angle_deg,
            rotor_degree: bus.rotor_degree(),
            speed_rpm: bus.speed_rpm(),
        };

        let (output, report) = self.proc(&input)?;
        bus.set_current(output.current);

        Ok(report)
    }
}

impl State for MotorCtrl {
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MotorCtrlError;

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if let Some(t) = input_data.target_angle_deg {
            trace!("MotorCtrl new target {} deg", t);
            self.target_angle_deg = t;
        }

        let speed_demand = self
            .angle_pid
            .compute(self.target_angle_deg, input_data.rotor_degree);
        let current_demand = self.speed_pid.compute(speed_demand, input_data.speed_rpm);

        // Float to int casts saturate, so anything outside the bus range is pinned to its limits
        let output = OutputData {
            current: current_demand as i16,
        };

        let report = StatusReport {
            target_angle_deg: self.target_angle_deg,
            speed_demand_rpm: speed_demand,
            current_demand,
            current_limited: current_demand.abs() >= self.speed_pid.params().max_output,
        };

        Ok((output, report))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FakeBus {
        angle: f32,
        speed: f32,
        current: Option<i16>,
    }

    impl MotorBus for FakeBus {
        fn rotor_degree(&self) -> f32 {
            self.angle
        }

        fn speed_rpm(&self) -> f32 {
            self.speed
        }

        fn set_current(&mut self, current: i16) {
            self.current = Some(current);
        }
    }

    #[test]
    fn test_cascade() {
        let mut ctrl = MotorCtrl::new(&Params::default()).unwrap();

        let (out, report) = ctrl
            .proc(&InputData {
                target_angle_deg: Some(90.0),
                rotor_degree: 0.0,
                speed_rpm: 0.0,
            })
            .unwrap();

        // Angle loop: 8 * 90 + 0.001 * 90
        assert!((report.speed_demand_rpm - 720.09).abs() < 1e-2);
        // Speed loop: 6 * e + 0.001 * e + 0.2 * e
        assert!((report.current_demand - 720.09 * 6.201).abs() < 1.0);
        assert!(out.current > 4460 && out.current < 4470);
        assert!(!report.current_limited);

        // Target is held when no new one arrives
        let (_, report) = ctrl
            .proc(&InputData {
                target_angle_deg: None,
                rotor_degree: 0.0,
                speed_rpm: 0.0,
            })
            .unwrap();
        assert_eq!(report.target_angle_deg, 90.0);
    }

    #[test]
    fn test_deadband_and_limit() {
        let mut ctrl = MotorCtrl::new(&Params::default()).unwrap();

        // Within the angle deadband nothing is commanded
        let (out, _) = ctrl
            .proc(&InputData {
                target_angle_deg: Some(10.0),
                rotor_degree: 0.0,
                speed_rpm: 0.0,
            })
            .unwrap();
        assert_eq!(out.current, 0);

        // Large errors saturate the speed loop
        let mut ctrl = MotorCtrl::new(&Params::default()).unwrap();
        let (out, report) = ctrl
            .proc(&InputData {
                target_angle_deg: Some(-900.0),
                rotor_degree: 0.0,
                speed_rpm: 0.0,
            })
            .unwrap();
        assert!(report.current_limited);
        assert_eq!(out.current, -8192);
    }

    #[test]
    fn test_drive_writes_bus() {
        let mut ctrl = MotorCtrl::new(&Params::default()).unwrap();
        let mut bus = FakeBus {
            angle: 0.0,
            speed: 0.0,
            current: None,
        };

        ctrl.drive(&mut bus, Some(180.0)).unwrap();
        assert!(bus.current.unwrap() > 0);
        assert_eq!(ctrl.target_angle_deg(), 180.0);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.speed_pid.integral_limit = -1.0;
        assert!(MotorCtrl::new(&params).is_err());
    }
}
