//! # PID controller
//!
//! Single loop PID controller used by every closed loop in the chassis: the motor angle and speed
//! loops and the axes of the simulated chassis.
//!
//! Two topologies are supported:
//!
//! - `Position`: output is computed from the error alone, the integral term accumulates and is
//!   clamped to the integral limit.
//! - `Incremental`: each step computes a change in output which is added to the previous output.
//!
//! The controller keeps a three deep history (now, last, last-last) of target, measurement and
//! error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use util::maths::{abs_limit, float_cmp, is_zero};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const LLAST: usize = 0;
const LAST: usize = 1;
const NOW: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration of a [`Pid`] controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    /// Output is clamped to `[-max_output, max_output]`
    pub max_output: f32,

    /// Integral term is clamped to `[-integral_limit, integral_limit]`
    pub integral_limit: f32,

    /// Errors smaller than this produce no output. Zero disables the deadband.
    pub deadband: f32,

    /// Errors larger than this produce no output. Zero disables the cutoff.
    pub max_error: f32,

    pub mode: PidMode,

    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// A PID controller
#[derive(Debug, Clone)]
pub struct Pid {
    params: PidParams,

    /// Target history, indexed by `LLAST`, `LAST`, `NOW`
    set: [f32; 3],

    /// Measurement history
    get: [f32; 3],

    /// Error history
    err: [f32; 3],

    pout: f32,
    iout: f32,
    dout: f32,

    /// Last output in position mode
    pos_out: f32,

    /// Last output in incremental mode
    delta_out: f32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Controller topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidMode {
    Position,
    Incremental,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidParams {
    /// Check the limits are usable. Gains are unrestricted.
    pub fn are_valid(&self) -> bool {
        let limits = [
            self.max_output,
            self.integral_limit,
            self.deadband,
            self.max_error,
        ];

        limits.iter().all(|l| l.is_finite() && *l >= 0.0)
    }
}

impl Pid {
    /// Create a new controller with zeroed history.
    pub fn new(params: PidParams) -> Self {
        Self {
            params,
            set: [0.0; 3],
            get: [0.0; 3],
            err: [0.0; 3],
            pout: 0.0,
            iout: 0.0,
            dout: 0.0,
            pos_out: 0.0,
            delta_out: 0.0,
        }
    }

    /// Compute the controller output for the given target and measurement.
    ///
    /// The current error is always recorded. If the error exceeds the max error cutoff, or falls
    /// within the deadband, zero is returned and the history is not advanced.
    pub fn compute(&mut self, target: f32, measurement: f32) -> f32 {
        self.get[NOW] = measurement;
        self.set[NOW] = target;
        self.err[NOW] = target - measurement;

        let err_mag = self.err[NOW].abs();

        if !is_zero(self.params.max_error)
            && float_cmp(err_mag, self.params.max_error) == Ordering::Greater
        {
            return 0.0;
        }

        if !is_zero(self.params.deadband)
            && float_cmp(err_mag, self.params.deadband) == Ordering::Less
        {
            return 0.0;
        }

        let p = &self.params;

        match p.mode {
            PidMode::Position => {
                self.pout = p.kp * self.err[NOW];
                self.iout = abs_limit(self.iout + p.ki * self.err[NOW], p.integral_limit);
                self.dout = p.kd * (self.err[NOW] - self.err[LAST]);

                self.pos_out = abs_limit(self.pout + self.iout + self.dout, p.max_output);
            }
            PidMode::Incremental => {
                self.pout = p.kp * (self.err[NOW] - self.err[LAST]);
                self.iout = abs_limit(p.ki * self.err[NOW], p.integral_limit);
                self.dout = p.kd * (self.err[NOW] - 2.0 * self.err[LAST] + self.err[LLAST]);

                let delta_u = self.pout + self.iout + self.dout;
                self.delta_out = abs_limit(self.delta_out + delta_u, p.max_output);
            }
        }

        shift(&mut self.err);
        shift(&mut self.get);
        shift(&mut self.set);

        self.output()
    }

    /// Replace the gains, keeping the history and accumulators.
    pub fn reset_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.params.kp = kp;
        self.params.ki = ki;
        self.params.kd = kd;
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    /// The last output for the current mode.
    pub fn output(&self) -> f32 {
        match self.params.mode {
            PidMode::Position => self.pos_out,
            PidMode::Incremental => self.delta_out,
        }
    }

    /// Error history as `(now, last, last_last)`.
    pub fn errors(&self) -> (f32, f32, f32) {
        (self.err[NOW], self.err[LAST], self.err[LLAST])
    }

    /// Target history as `(now, last, last_last)`.
    pub fn targets(&self) -> (f32, f32, f32) {
        (self.set[NOW], self.set[LAST], self.set[LLAST])
    }

    /// Measurement history as `(now, last, last_last)`.
    pub fn measurements(&self) -> (f32, f32, f32) {
        (self.get[NOW], self.get[LAST], self.get[LLAST])
    }
}

/// Move `LAST` into `LLAST` and `NOW` into `LAST`.
fn shift(hist: &mut [f32; 3]) {
    hist[LLAST] = hist[LAST];
    hist[LAST] = hist[NOW];
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(mode: PidMode, kp: f32, ki: f32, kd: f32) -> PidParams {
        PidParams {
            max_output: 100.0,
            integral_limit: 15.0,
            deadband: 0.0,
            max_error: 0.0,
            mode,
            kp,
            ki,
            kd,
        }
    }

    #[test]
    fn test_position_proportional() {
        let mut pid = Pid::new(params(PidMode::Position, 1.0, 0.0, 0.0));

        assert_eq!(pid.compute(10.0, 0.0), 10.0);
        assert_eq!(pid.errors(), (10.0, 10.0, 0.0));
        assert_eq!(pid.targets().1, 10.0);

        // Output clamp
        assert_eq!(pid.compute(1000.0, 0.0), 100.0);
        assert_eq!(pid.compute(-1000.0, 0.0), -100.0);
    }

    #[test]
    fn test_position_integral_and_derivative() {
        let mut pid = Pid::new(params(PidMode::Position, 0.0, 1.0, 0.0));

        assert_eq!(pid.compute(10.0, 0.0), 10.0);
        // Integral limited to 15
        assert_eq!(pid.compute(10.0, 0.0), 15.0);
        assert_eq!(pid.compute(10.0, 0.0), 15.0);

        let mut pid = Pid::new(params(PidMode::Position, 0.0, 0.0, 2.0));
        assert_eq!(pid.compute(4.0, 0.0), 8.0);
        assert_eq!(pid.compute(4.0, 1.0), -2.0);
    }

    #[test]
    fn test_max_error_cutoff() {
        let mut p = params(PidMode::Position, 1.0, 0.0, 0.0);
        p.max_error = 5.0;
        let mut pid = Pid::new(p);

        assert_eq!(pid.compute(100.0, 0.0), 0.0);

        // Current error recorded, history untouched
        assert_eq!(pid.errors(), (100.0, 0.0, 0.0));
        assert_eq!(pid.measurements(), (0.0, 0.0, 0.0));
        assert_eq!(pid.targets(), (100.0, 0.0, 0.0));

        assert_eq!(pid.compute(4.0, 0.0), 4.0);
    }

    #[test]
    fn test_deadband() {
        let mut p = params(PidMode::Position, 1.0, 0.0, 0.0);
        p.deadband = 2.0;
        let mut pid = Pid::new(p);

        assert_eq!(pid.compute(1.5, 0.0), 0.0);
        assert_eq!(pid.errors(), (1.5, 0.0, 0.0));
        assert_eq!(pid.compute(3.0, 0.0), 3.0);

        // Zero deadband passes any error through
        let mut pid = Pid::new(params(PidMode::Position, 1.0, 0.0, 0.0));
        assert_eq!(pid.compute(0.5, 0.0), 0.5);
    }

    #[test]
    fn test_incremental() {
        let mut pid = Pid::new(params(PidMode::Incremental, 1.0, 0.0, 0.0));

        // Proportional on the change in error
        assert_eq!(pid.compute(10.0, 0.0), 10.0);
        assert_eq!(pid.compute(10.0, 0.0), 10.0);
        assert_eq!(pid.compute(10.0, 5.0), 5.0);

        // Integral is not accumulated but the output is
        let mut pid = Pid::new(params(PidMode::Incremental, 0.0, 0.5, 0.0));
        assert_eq!(pid.compute(10.0, 0.0), 5.0);
        assert_eq!(pid.compute(10.0, 0.0), 10.0);
        assert_eq!(pid.compute(10.0, 0.0), 15.0);

        // Second difference derivative
        let mut pid = Pid::new(params(PidMode::Incremental, 0.0, 0.0, 1.0));
        assert_eq!(pid.compute(2.0, 0.0), 2.0);
        assert_eq!(pid.compute(2.0, 0.0), 0.0);
    }

    #[test]
    fn test_reset_gains() {
        let mut pid = Pid::new(params(PidMode::Position, 0.0, 1.0, 0.0));
        pid.compute(10.0, 0.0);

        // New gains keep the accumulated integral
        pid.reset_gains(1.0, 0.0, 0.0);
        assert_eq!(pid.compute(1.0, 0.0), 11.0);
        assert_eq!(pid.params().kp, 1.0);
        assert_eq!(pid.params().mode, PidMode::Position);
    }

    #[test]
    fn test_params_valid() {
        let mut p = params(PidMode::Position, 1.0, 0.0, 0.0);
        assert!(p.are_valid());
        p.max_output = -1.0;
        assert!(!p.are_valid());
        p.max_output = f32::NAN;
        assert!(!p.are_valid());
    }
}
