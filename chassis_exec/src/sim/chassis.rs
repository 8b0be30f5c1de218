//! Simulated chassis

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use serde::Deserialize;

use super::SimError;
use crate::{
    chassis_ctrl::MAX_STORAGE_INDEX,
    motion::{MotionPrimitives, Point},
    pid::{Pid, PidParams},
};
use util::maths::wrap_deg_180;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated chassis.
#[derive(Debug, Clone, Deserialize)]
pub struct SimChassisParams {
    /// Time simulated by each primitive call, normally the chassis cycle period
    ///
    /// Units: seconds
    pub step_s: f32,

    /// Position loops, error in mm to velocity in mm/s
    pub xy_pid: PidParams,

    /// Heading loop, error in degrees to rate in degrees/s
    pub angle_pid: PidParams,

    /// Distance within which a point counts as reached
    ///
    /// Units: mm
    pub pos_tolerance_mm: f32,

    /// Heading error within which a point counts as reached
    ///
    /// Units: degrees
    pub angle_tolerance_deg: f32,

    /// Scale from a direct velocity command to mm/s (and degrees/s for rotation)
    pub velocity_scale: f32,

    /// Number of cycles the clearing action takes once centred
    pub clear_cycles: u32,

    /// Pose the position estimate is reset to
    pub reset_pose: Point,

    /// Storage slot poses, indexed by slot
    pub storage_slots: Vec<Point>,
}

/// Point mass chassis driven by per-axis PID loops.
pub struct SimChassis {
    params: SimChassisParams,

    pose: Point,

    x_pid: Pid,
    y_pid: Pid,
    angle_pid: Pid,

    /// Path currently being followed and the index of the next point on it
    path: Vec<Point>,
    path_progress: usize,

    /// Cycles of clearing done so far
    clear_progress: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimChassis {
    pub fn new(params: SimChassisParams) -> Result<Self, SimError> {
        if params.step_s <= 0.0 {
            return Err(SimError::InvalidParams("step_s must be positive".into()));
        }
        if !params.xy_pid.are_valid() || !params.angle_pid.are_valid() {
            return Err(SimError::InvalidParams("invalid chassis PID limits".into()));
        }
        if params.storage_slots.len() <= MAX_STORAGE_INDEX as usize {
            return Err(SimError::InvalidParams(format!(
                "expected {} storage slots, found {}",
                MAX_STORAGE_INDEX + 1,
                params.storage_slots.len()
            )));
        }

        Ok(Self {
            pose: params.reset_pose,
            x_pid: Pid::new(params.xy_pid),
            y_pid: Pid::new(params.xy_pid),
            angle_pid: Pid::new(params.angle_pid),
            path: Vec::new(),
            path_progress: 0,
            clear_progress: 0,
            params,
        })
    }

    pub fn pose(&self) -> Point {
        self.pose
    }

    /// Move at the given velocity for one step.
    fn integrate(&mut self, vx: f32, vy: f32, vrot: f32) {
        let dt = self.params.step_s;

        self.pose.x += vx * dt;
        self.pose.y += vy * dt;
        self.pose.angle = wrap_deg_180(self.pose.angle + vrot * dt);
    }

    fn at(&self, point: &Point) -> bool {
        let dist = (point.x - self.pose.x).hypot(point.y - self.pose.y);
        let angle_err = wrap_deg_180(point.angle - self.pose.angle).abs();

        dist < self.params.pos_tolerance_mm && angle_err < self.params.angle_tolerance_deg
    }

    /// Step towards a point, returning true once there.
    fn step_to(&mut self, point: &Point) -> bool {
        if self.at(point) {
            return true;
        }

        // Heading target is taken the short way round
        let angle_target = self.pose.angle + wrap_deg_180(point.angle - self.pose.angle);

        let vx = self.x_pid.compute(point.x, self.pose.x);
        let vy = self.y_pid.compute(point.y, self.pose.y);
        let vrot = self.angle_pid.compute(angle_target, self.pose.angle);

        self.integrate(vx, vy, vrot);

        self.at(point)
    }
}

impl MotionPrimitives for SimChassis {
    fn go_to_point(&mut self, point: &Point) -> bool {
        self.step_to(point)
    }

    fn go_path(&mut self, points: &[Point]) -> bool {
        if self.path.as_slice() != points {
            debug!("SimChassis starting a {} point path", points.len());
            self.path = points.to_vec();
            self.path_progress = 0;
        }

        let target = match self.path.get(self.path_progress) {
            Some(p) => *p,
            None => return true,
        };

        if self.step_to(&target) {
            self.path_progress += 1;
        }

        if self.path_progress >= self.path.len() {
            self.path.clear();
            self.path_progress = 0;
            return true;
        }

        false
    }

    fn go_to_storage(&mut self, slot: u8) -> bool {
        match self.params.storage_slots.get(slot as usize).copied() {
            Some(p) => self.step_to(&p),
            None => {
                warn!("No storage slot {}", slot);
                false
            }
        }
    }

    fn center_and_clear(&mut self, point: &Point) -> bool {
        if !self.step_to(point) {
            return false;
        }

        self.clear_progress += 1;
        if self.clear_progress >= self.params.clear_cycles {
            self.clear_progress = 0;
            return true;
        }

        false
    }

    fn reset_position(&mut self) {
        debug!("SimChassis position reset");
        self.pose = self.params.reset_pose;
    }

    fn set_velocity(&mut self, vx: f32, vy: f32, vrot: f32) {
        let scale = self.params.velocity_scale;
        self.integrate(vx * scale, vy * scale, vrot * scale);
    }
}
