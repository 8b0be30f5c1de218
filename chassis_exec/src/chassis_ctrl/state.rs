//! Implementations for the ChassisCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, trace, warn};

// Internal
use super::{
    ChassisCtrlError, ChassisMode, ChassisStatus, Indicator, Params, INDEX_NONE,
    MAX_STORAGE_INDEX, POSITION_RESET_INDEX, RETRY_ROUTE_INDEX, ROUTE_INDEX,
};
use crate::{
    motion::{MotionPrimitives, Point},
    remote_ctrl::Sticks,
};
use comms_if::eqpt::chassis::ChassisMsg;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Chassis control module state
pub struct ChassisCtrl<M, I> {
    params: Params,

    motion: M,
    indicator: I,

    mode: ChassisMode,
    status: ChassisStatus,

    /// Selected point, route or storage slot, `INDEX_NONE` when there is none
    target_index: u8,

    /// Target of the last point command
    received_point: Point,

    /// True while centering after a route, retried every cycle until it succeeds
    centering: bool,

    /// A new target was accepted while centering, so the route's arrival isn't reported
    centering_superseded: bool,

    num_cycles: u64,

    /// Cycles spent in `PeerFault`
    fault_cycles: u64,

    /// Set once the missing retry route has been reported for the current target
    retry_route_reported: bool,
}

/// Input data to chassis control.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Messages received from the main board since the last cycle, oldest first
    pub msgs: Vec<ChassisMsg>,

    /// Mode requested since the last cycle, if any
    pub mode_request: Option<ChassisMode>,

    /// Latest remote stick positions
    pub sticks: Sticks,
}

/// Output of chassis control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputData {
    /// Messages to send to the main board, in order
    pub replies: Vec<ChassisMsg>,
}

/// Status report for chassis control processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub status: ChassisStatus,
    pub mode: ChassisMode,
    pub target_index: u8,

    /// Centering after a route is in progress
    pub centering: bool,

    /// The retry route was selected but none is configured
    pub route_not_implemented: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M, I> ChassisCtrl<M, I>
where
    M: MotionPrimitives,
    I: Indicator,
{
    /// Create a new chassis control instance.
    ///
    /// The chassis starts in `Arrived` with no target, in the mode given by the parameters.
    pub fn new(params: Params, motion: M, mut indicator: I) -> Result<Self, ChassisCtrlError> {
        params.validate()?;

        indicator.set(params.initial_mode == ChassisMode::Auto);

        Ok(Self {
            mode: params.initial_mode,
            params,
            motion,
            indicator,
            status: ChassisStatus::Arrived,
            target_index: INDEX_NONE,
            received_point: Point::default(),
            centering: false,
            centering_superseded: false,
            num_cycles: 0,
            fault_cycles: 0,
            retry_route_reported: false,
        })
    }

    pub fn status(&self) -> ChassisStatus {
        self.status
    }

    pub fn mode(&self) -> ChassisMode {
        self.mode
    }

    pub fn target_index(&self) -> u8 {
        self.target_index
    }

    pub fn received_point(&self) -> Point {
        self.received_point
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut M {
        &mut self.motion
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            mode: self.mode,
            target_index: self.target_index,
            centering: self.centering,
            route_not_implemented: self.retry_route_reported,
        }
    }

    fn set_status(&mut self, status: ChassisStatus) {
        if status != self.status {
            info!(
                "Chassis status {:?} -> {:?} (index {})",
                self.status, status, self.target_index
            );
        }
        self.status = status;
    }

    fn switch_mode(&mut self, mode: ChassisMode) {
        if mode == self.mode {
            return;
        }

        info!("Chassis mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;

        // The fault indication owns the indicator once faulted
        if self.status != ChassisStatus::PeerFault {
            self.indicator.set(mode == ChassisMode::Auto);
        }
    }

    /// Handle one message from the main board.
    fn handle_msg(&mut self, msg: ChassisMsg, output: &mut OutputData) {
        trace!("Handling {:?} in {:?}", msg, self.status);

        if self.status == ChassisStatus::PeerFault {
            match msg {
                ChassisMsg::GetState => output.replies.push(ChassisMsg::Error),
                m => warn!("Chassis is faulted, ignoring {:?}", m),
            }
            return;
        }

        match msg {
            ChassisMsg::MainInit => {
                if self.status == ChassisStatus::Arrived {
                    output.replies.push(ChassisMsg::Init);
                } else {
                    error!(
                        "Main board restarted while the chassis was {:?}, stopping",
                        self.status
                    );
                    self.centering = false;
                    self.centering_superseded = false;
                    self.fault_cycles = 0;
                    self.set_status(ChassisStatus::PeerFault);
                }
            }
            ChassisMsg::GetState => output.replies.push(match self.status {
                ChassisStatus::Arrived => ChassisMsg::Arrive,
                ChassisStatus::PeerFault => ChassisMsg::Error,
                _ => ChassisMsg::NotArrive,
            }),
            ChassisMsg::PathData(idx) => {
                output.replies.push(ChassisMsg::Received);

                if idx > RETRY_ROUTE_INDEX {
                    warn!("Target index {} is out of range, ignored", idx);
                    return;
                }

                self.supersede_centering();
                self.target_index = idx;
                self.retry_route_reported = false;

                if idx <= MAX_STORAGE_INDEX {
                    self.set_status(ChassisStatus::GoingToStorage);
                } else {
                    self.set_status(ChassisStatus::GoingPath);
                }
            }
            ChassisMsg::PointData(point) => {
                output.replies.push(ChassisMsg::Received);

                self.supersede_centering();
                self.received_point = point;
                self.retry_route_reported = false;
                self.set_status(ChassisStatus::GoingToPoint);
            }
            m => warn!("Unexpected {:?} message from the main board, ignored", m),
        }
    }

    /// Centering runs to completion, but the route it belongs to is no longer the target.
    fn supersede_centering(&mut self) {
        if self.centering && !self.centering_superseded {
            info!("New target received while centering, the route's arrival won't be reported");
            self.centering_superseded = true;
        }
    }

    fn step_fault(&mut self) {
        self.motion.set_velocity(0.0, 0.0, 0.0);

        if self.fault_cycles % self.params.fault_report_period_cycles as u64 == 0 {
            self.indicator.toggle();
            error!("Main board restarted while moving, the chassis must be restarted");
        }

        self.fault_cycles += 1;
    }

    fn step_manual(&mut self, sticks: &Sticks) {
        if self.num_cycles % self.params.manual_period_cycles as u64 != 0 {
            return;
        }

        let vx = -self.stick_axis(sticks.left_x);
        let vy = self.stick_axis(sticks.left_y);
        let vrot = self.stick_axis(sticks.right_x);

        self.motion.set_velocity(vx, vy, vrot);
    }

    /// Signed deflection of a stick, zero within the dead zone.
    fn stick_axis(&self, value: u8) -> f32 {
        let deflection = value as i16 - self.params.stick_centre as i16;

        if deflection.abs() > self.params.stick_dead_zone as i16 {
            deflection as f32
        } else {
            0.0
        }
    }

    fn step_auto(&mut self, output: &mut OutputData) {
        let arrived = match self.status {
            ChassisStatus::GoingToPoint => self.motion.go_to_point(&self.received_point),
            ChassisStatus::GoingPath => match self.target_index {
                ROUTE_INDEX => self.motion.go_path(&self.params.route),
                RETRY_ROUTE_INDEX => match &self.params.retry_route {
                    Some(r) => self.motion.go_path(r),
                    None => {
                        if !self.retry_route_reported {
                            error!("Retry route selected but not implemented, the chassis will not arrive");
                            self.retry_route_reported = true;
                        }
                        false
                    }
                },
                _ => false,
            },
            ChassisStatus::GoingToStorage => {
                if self.target_index <= MAX_STORAGE_INDEX {
                    self.motion.go_to_storage(self.target_index)
                } else {
                    false
                }
            }
            ChassisStatus::Arrived => {
                self.motion.set_velocity(0.0, 0.0, 0.0);
                false
            }
            ChassisStatus::PeerFault => false,
        };

        if arrived && self.status.in_progress() {
            self.on_arrival(output);
        }
    }

    /// Run the follow up action for the target just reached, then report arrival.
    fn on_arrival(&mut self, output: &mut OutputData) {
        debug!("Target {} reached in {:?}", self.target_index, self.status);

        match (self.status, self.target_index) {
            (ChassisStatus::GoingPath, ROUTE_INDEX) | (ChassisStatus::GoingPath, RETRY_ROUTE_INDEX) => {
                if !self.motion.center_and_clear(&self.params.centering_point) {
                    debug!("Centering not complete, retrying next cycle");
                    self.centering = true;
                    return;
                }
            }
            (ChassisStatus::GoingToStorage, POSITION_RESET_INDEX) => {
                self.motion.reset_position();
            }
            _ => (),
        }

        self.complete_arrival(output);
    }

    fn complete_arrival(&mut self, output: &mut OutputData) {
        output.replies.push(ChassisMsg::Arrive);
        self.set_status(ChassisStatus::Arrived);
        self.target_index = INDEX_NONE;
        self.retry_route_reported = false;
    }
}

impl<M, I> State for ChassisCtrl<M, I>
where
    M: MotionPrimitives,
    I: Indicator,
{
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ChassisCtrlError;

    /// Perform one cycle of chassis control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut output = OutputData::default();

        if let Some(mode) = input_data.mode_request {
            self.switch_mode(mode);
        }

        // Messages are answered against the status at receipt, centering or not
        for msg in input_data.msgs.iter() {
            self.handle_msg(*msg, &mut output);
        }

        // Centering holds the motion until it succeeds, whatever the mode
        if self.centering {
            if self.motion.center_and_clear(&self.params.centering_point) {
                self.centering = false;
                if self.centering_superseded {
                    debug!("Centering complete, driving to target {}", self.target_index);
                    self.centering_superseded = false;
                } else {
                    self.complete_arrival(&mut output);
                }
            } else {
                trace!("Centering not complete");
            }
            self.num_cycles += 1;
            return Ok((output, self.report()));
        }

        match (self.status, self.mode) {
            (ChassisStatus::PeerFault, _) => self.step_fault(),
            (_, ChassisMode::Manual) => self.step_manual(&input_data.sticks),
            (_, ChassisMode::Auto) => self.step_auto(&mut output),
        }

        self.num_cycles += 1;

        Ok((output, self.report()))
    }
}
