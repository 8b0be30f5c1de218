//! Parameters structure for ChassisCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{ChassisCtrlError, ChassisMode};
use crate::motion::Point;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for chassis control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- MODES ----
    /// Mode the chassis starts in
    pub initial_mode: ChassisMode,

    /// Number of chassis cycles between velocity commands in manual mode
    pub manual_period_cycles: u32,

    /// Number of chassis cycles between fault reports in `PeerFault`
    pub fault_report_period_cycles: u32,

    // ---- STICKS ----
    /// Stick value at rest
    pub stick_centre: u8,

    /// Stick deflections up to and including this value are treated as zero
    pub stick_dead_zone: u8,

    // ---- TARGETS ----
    /// Point centred on after finishing a route
    pub centering_point: Point,

    /// Designated route, target index 6
    pub route: Vec<Point>,

    /// Retry route, target index 7
    #[serde(default)]
    pub retry_route: Option<Vec<Point>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), ChassisCtrlError> {
        if self.manual_period_cycles == 0 {
            return Err(ChassisCtrlError::InvalidParams(
                "manual_period_cycles must be at least 1".into(),
            ));
        }
        if self.fault_report_period_cycles == 0 {
            return Err(ChassisCtrlError::InvalidParams(
                "fault_report_period_cycles must be at least 1".into(),
            ));
        }
        if self.stick_dead_zone >= self.stick_centre {
            return Err(ChassisCtrlError::InvalidParams(
                "stick_dead_zone must be smaller than stick_centre".into(),
            ));
        }
        if self.route.is_empty() {
            return Err(ChassisCtrlError::InvalidParams("route is empty".into()));
        }
        if let Some(r) = &self.retry_route {
            if r.is_empty() {
                return Err(ChassisCtrlError::InvalidParams(
                    "retry_route is empty, remove it instead".into(),
                ));
            }
        }

        Ok(())
    }
}
