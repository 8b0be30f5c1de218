//! # Chassis Equipment Messages
//!
//! Messages exchanged between the chassis and the main board over the [`MsgMean::Chassis`] link.
//!
//! Status and command messages are `U8` frames whose first byte is the message code. A path
//! command carries the path index in the second byte. A point target is an `F32` frame of three
//! little-endian values, `x`, `y` and `angle`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};
use heapless::Vec as PayloadVec;
use serde::{Deserialize, Serialize};

use crate::msg::{MsgDataType, MsgMean, MsgSender, RecvMsg, MSG_MAX_DATA_LEN};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Length in bytes of an encoded point target.
pub const POINT_DATA_LEN: usize = 12;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar pose target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position in mm
    pub x: f32,

    /// Y position in mm
    pub y: f32,

    /// Heading in degrees
    pub angle: f32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A message on the chassis link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChassisMsg {
    /// Chassis has started, chassis -> main board
    Init,

    /// A command was received, chassis -> main board
    Received,

    /// The current target has not been reached yet, chassis -> main board
    NotArrive,

    /// The current target has been reached, chassis -> main board
    Arrive,

    /// The chassis is moving, chassis -> main board
    Move,

    /// The chassis has faulted, chassis -> main board
    Error,

    /// The main board has (re)started, main board -> chassis
    MainInit,

    /// Request for the chassis status, main board -> chassis
    GetState,

    /// Go to the path, route or storage slot with the given index, main board -> chassis
    PathData(u8),

    /// Go to the given point, main board -> chassis
    PointData(Point),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ChassisMsgError {
    #[error("Expected a chassis message, found a {0:?} message")]
    WrongMean(MsgMean),

    #[error("Unknown chassis message code {0}")]
    UnknownCode(u8),

    #[error("Path message has no index")]
    MissingIndex,

    #[error("Point message is {0} bytes long, expected {}", POINT_DATA_LEN)]
    WrongPointLength(usize),

    #[error("Chassis messages can't be sent as {0:?}")]
    UnsupportedType(MsgDataType),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ChassisMsg {
    /// Get the message code for this message, or `None` for point targets which don't have one.
    pub fn code(&self) -> Option<u8> {
        use ChassisMsg::*;

        match self {
            Init => Some(0),
            Received => Some(1),
            NotArrive => Some(2),
            Arrive => Some(3),
            Move => Some(4),
            Error => Some(5),
            MainInit => Some(6),
            GetState => Some(7),
            PathData(_) => Some(8),
            PointData(_) => None,
        }
    }

    /// Encode the message into its data type and payload.
    pub fn to_payload(&self) -> (MsgDataType, PayloadVec<u8, MSG_MAX_DATA_LEN>) {
        let mut payload = PayloadVec::new();

        // All payloads are at most 12 bytes so the pushes can't overflow
        match self {
            ChassisMsg::PointData(p) => {
                let mut buf = [0u8; POINT_DATA_LEN];
                LittleEndian::write_f32_into(&[p.x, p.y, p.angle], &mut buf);
                payload.extend_from_slice(&buf).ok();
                (MsgDataType::F32, payload)
            }
            ChassisMsg::PathData(idx) => {
                payload.extend_from_slice(&[8, *idx]).ok();
                (MsgDataType::U8, payload)
            }
            other => {
                payload.extend(other.code());
                (MsgDataType::U8, payload)
            }
        }
    }

    /// Send this message on the chassis link.
    pub fn send(&self, sender: &MsgSender) {
        let (data_type, payload) = self.to_payload();
        sender.send(MsgMean::Chassis, data_type, &payload);
    }
}

impl<'a> TryFrom<&RecvMsg<'a>> for ChassisMsg {
    type Error = ChassisMsgError;

    fn try_from(msg: &RecvMsg<'a>) -> Result<Self, ChassisMsgError> {
        if msg.mean != MsgMean::Chassis {
            return Err(ChassisMsgError::WrongMean(msg.mean));
        }

        match msg.data_type {
            MsgDataType::F32 => {
                if msg.data.len() != POINT_DATA_LEN {
                    return Err(ChassisMsgError::WrongPointLength(msg.data.len()));
                }

                let mut vals = [0f32; 3];
                LittleEndian::read_f32_into(msg.data, &mut vals);

                Ok(ChassisMsg::PointData(Point {
                    x: vals[0],
                    y: vals[1],
                    angle: vals[2],
                }))
            }
            MsgDataType::U8 => {
                // Payloads are never empty once decoded
                let code = msg.data.first().copied().unwrap_or(u8::MAX);

                match code {
                    0 => Ok(ChassisMsg::Init),
                    1 => Ok(ChassisMsg::Received),
                    2 => Ok(ChassisMsg::NotArrive),
                    3 => Ok(ChassisMsg::Arrive),
                    4 => Ok(ChassisMsg::Move),
                    5 => Ok(ChassisMsg::Error),
                    6 => Ok(ChassisMsg::MainInit),
                    7 => Ok(ChassisMsg::GetState),
                    8 => match msg.data.get(1) {
                        Some(idx) => Ok(ChassisMsg::PathData(*idx)),
                        None => Err(ChassisMsgError::MissingIndex),
                    },
                    c => Err(ChassisMsgError::UnknownCode(c)),
                }
            }
            t => Err(ChassisMsgError::UnsupportedType(t)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg::frame;

    fn decode_sent(msg: ChassisMsg) -> Result<ChassisMsg, ChassisMsgError> {
        let (data_type, payload) = msg.to_payload();
        let bytes = frame::encode(MsgMean::Chassis, data_type, &payload).unwrap();
        let recv = frame::decode(&bytes).unwrap();
        ChassisMsg::try_from(&recv)
    }

    #[test]
    fn test_chassis_msg_codes() {
        let (t, p) = ChassisMsg::Arrive.to_payload();
        assert_eq!(t, MsgDataType::U8);
        assert_eq!(&p[..], &[3]);

        let (t, p) = ChassisMsg::PathData(6).to_payload();
        assert_eq!(t, MsgDataType::U8);
        assert_eq!(&p[..], &[8, 6]);

        for msg in &[
            ChassisMsg::Init,
            ChassisMsg::Error,
            ChassisMsg::GetState,
            ChassisMsg::PathData(2),
        ] {
            assert_eq!(decode_sent(*msg), Ok(*msg));
        }
    }

    #[test]
    fn test_point_data() {
        let point = Point {
            x: 1715.0,
            y: -1920.5,
            angle: -90.0,
        };
        let (t, p) = ChassisMsg::PointData(point).to_payload();
        assert_eq!(t, MsgDataType::F32);
        assert_eq!(p.len(), POINT_DATA_LEN);
        assert_eq!(decode_sent(ChassisMsg::PointData(point)), Ok(ChassisMsg::PointData(point)));

        let short = RecvMsg {
            mean: MsgMean::Chassis,
            data_type: MsgDataType::F32,
            data: &[0u8; 8],
        };
        assert_eq!(
            ChassisMsg::try_from(&short),
            Err(ChassisMsgError::WrongPointLength(8))
        );
    }

    #[test]
    fn test_invalid_chassis_msgs() {
        fn msg(mean: MsgMean, data_type: MsgDataType, data: &[u8]) -> RecvMsg<'_> {
            RecvMsg {
                mean,
                data_type,
                data,
            }
        }

        assert_eq!(
            ChassisMsg::try_from(&msg(MsgMean::Remote, MsgDataType::U8, &[1])),
            Err(ChassisMsgError::WrongMean(MsgMean::Remote))
        );
        assert_eq!(
            ChassisMsg::try_from(&msg(MsgMean::Chassis, MsgDataType::U8, &[9])),
            Err(ChassisMsgError::UnknownCode(9))
        );
        assert_eq!(
            ChassisMsg::try_from(&msg(MsgMean::Chassis, MsgDataType::U8, &[8])),
            Err(ChassisMsgError::MissingIndex)
        );
        assert_eq!(
            ChassisMsg::try_from(&msg(MsgMean::Chassis, MsgDataType::I16, &[1, 0])),
            Err(ChassisMsgError::UnsupportedType(MsgDataType::I16))
        );
    }

    #[test]
    fn test_error_code_is_a_message() {
        // Code 5 is the chassis fault report, not a decode failure
        let recv = RecvMsg {
            mean: MsgMean::Chassis,
            data_type: MsgDataType::U8,
            data: &[5],
        };
        let decoded: Result<ChassisMsg, ChassisMsgError> = ChassisMsg::try_from(&recv);
        assert_eq!(decoded, Ok(ChassisMsg::Error));
        assert_eq!(ChassisMsg::Error.code(), Some(5));
    }
}
