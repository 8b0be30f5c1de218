//! # Chassis control module
//!
//! Chassis control is the navigation state machine of the chassis. It runs in one of two modes:
//!
//! - Autonomous: commands from the main board select a target (a point, a route, or a storage
//!   slot) which is driven to with the motion primitives. Arrival is reported back to the main
//!   board.
//! - Manual: the remote controller's sticks are mapped directly to a body velocity.
//!
//! The navigation status is one of `GoingToPoint`, `GoingPath`, `GoingToStorage`, `Arrived` and
//! `PeerFault`. A main board restart while a target is being driven to puts the chassis into
//! `PeerFault`, which is terminal: the chassis is held stationary and the fault is reported
//! periodically until the chassis is restarted.
//!
//! Commands are handled in both modes so the main board always gets its replies, but targets are
//! only driven to in autonomous mode.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod indicator;
mod params;
mod state;
mod status_cell;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use indicator::*;
pub use params::Params;
pub use state::*;
pub use status_cell::StatusCell;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Highest target index that selects a storage slot.
pub const MAX_STORAGE_INDEX: u8 = 5;

/// Storage slot after which the position estimate is reset.
pub const POSITION_RESET_INDEX: u8 = 5;

/// Target index of the designated route.
pub const ROUTE_INDEX: u8 = 6;

/// Target index of the retry route.
pub const RETRY_ROUTE_INDEX: u8 = 7;

/// Target index meaning no target is selected.
pub const INDEX_NONE: u8 = 8;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Navigation status of the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChassisStatus {
    GoingToPoint = 0,
    GoingPath = 1,
    GoingToStorage = 2,
    Arrived = 3,
    PeerFault = 4,
}

/// Control mode of the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChassisMode {
    Manual = 0,
    Auto = 1,
}

/// Possible errors that can occur in chassis control.
#[derive(Debug, thiserror::Error)]
pub enum ChassisCtrlError {
    #[error("Invalid chassis control parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        use ChassisStatus::*;

        match value {
            0 => Some(GoingToPoint),
            1 => Some(GoingPath),
            2 => Some(GoingToStorage),
            3 => Some(Arrived),
            4 => Some(PeerFault),
            _ => None,
        }
    }

    /// True while a target is being driven to.
    pub fn in_progress(&self) -> bool {
        matches!(
            self,
            ChassisStatus::GoingToPoint | ChassisStatus::GoingPath | ChassisStatus::GoingToStorage
        )
    }
}

impl ChassisMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChassisMode::Manual),
            1 => Some(ChassisMode::Auto),
            _ => None,
        }
    }
}
