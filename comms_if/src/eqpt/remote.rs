//! # Remote Controller Messages
//!
//! The remote controller reports its state as a `U8` frame on the [`MsgMean::Remote`] link:
//! `[key, left_x, left_y, right_x, right_y]`. Key 0 means no key is pressed, stick values run
//! from 0 to 24 with 12 at centre.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use crate::msg::{MsgDataType, MsgMean, MsgSender, RecvMsg};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length in bytes of an encoded report.
pub const REMOTE_REPORT_LEN: usize = 5;

/// Value reported by a stick at rest.
pub const STICK_CENTRE: u8 = 12;

/// Key value reported when no key is pressed.
pub const KEY_NONE: u8 = 0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single report from the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteReport {
    pub key: u8,
    pub left_x: u8,
    pub left_y: u8,
    pub right_x: u8,
    pub right_y: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum RemoteReportError {
    #[error("Expected a remote message, found a {0:?} message")]
    WrongMean(MsgMean),

    #[error("Remote reports are U8, found {0:?}")]
    WrongType(MsgDataType),

    #[error("Remote report is {0} bytes long, expected {}", REMOTE_REPORT_LEN)]
    WrongLength(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RemoteReport {
    fn default() -> Self {
        Self {
            key: KEY_NONE,
            left_x: STICK_CENTRE,
            left_y: STICK_CENTRE,
            right_x: STICK_CENTRE,
            right_y: STICK_CENTRE,
        }
    }
}

impl RemoteReport {
    pub fn to_bytes(&self) -> [u8; REMOTE_REPORT_LEN] {
        [self.key, self.left_x, self.left_y, self.right_x, self.right_y]
    }

    /// Send this report on the remote link.
    pub fn send(&self, sender: &MsgSender) {
        sender.send(MsgMean::Remote, MsgDataType::U8, &self.to_bytes());
    }
}

impl<'a> TryFrom<&RecvMsg<'a>> for RemoteReport {
    type Error = RemoteReportError;

    fn try_from(msg: &RecvMsg<'a>) -> Result<Self, Self::Error> {
        if msg.mean != MsgMean::Remote {
            return Err(RemoteReportError::WrongMean(msg.mean));
        }
        if msg.data_type != MsgDataType::U8 {
            return Err(RemoteReportError::WrongType(msg.data_type));
        }

        match msg.data {
            [key, left_x, left_y, right_x, right_y] => Ok(Self {
                key: *key,
                left_x: *left_x,
                left_y: *left_y,
                right_x: *right_x,
                right_y: *right_y,
            }),
            d => Err(RemoteReportError::WrongLength(d.len())),
        }
    }
}
