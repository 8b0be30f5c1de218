//! # Message Protocol
//!
//! Fixed-format binary messages exchanged over one or more [`Channel`](crate::channel::Channel)s.
//! Each frame on the wire is laid out as:
//!
//! ```text
//! byte 0:      (mean << 4) | data_type
//! byte 1:      payload length            (1..=MSG_MAX_DATA_LEN)
//! byte 2..N:   payload bytes             (N = 2 + payload length)
//! byte N:      0xFF                      (terminator)
//! ```
//!
//! The mean (semantic category) selects which registered callback handles the frame, the data
//! type describes how the payload is encoded. See [`MsgProtocol`] for registration, sending and
//! polling.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod frame;
mod protocol;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use frame::FrameError;
pub use protocol::{MsgProtocol, MsgSender, RecvCallback};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum payload length of a single frame.
pub const MSG_MAX_DATA_LEN: usize = 16;

/// Number of bytes a frame carries on top of its payload (header byte, length byte, terminator).
pub const MSG_FRAME_OVERHEAD: usize = 3;

/// Maximum length of a complete frame on the wire.
pub const MSG_MAX_FRAME_LEN: usize = MSG_MAX_DATA_LEN + MSG_FRAME_OVERHEAD;

/// Final byte of every frame.
pub const MSG_TERMINATOR: u8 = 0xFF;

// The length byte must be able to describe every payload, and 250 and above collide with the
// poll result codes.
const _: () = assert!(MSG_MAX_DATA_LEN > 1 && MSG_MAX_DATA_LEN < 250);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A validated message handed to a receive callback.
///
/// The payload is a bounded view into the poll buffer and is only valid for the duration of the
/// callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecvMsg<'a> {
    /// Semantic category the frame was sent under
    pub mean: MsgMean,

    /// Encoding of the payload
    pub data_type: MsgDataType,

    /// Payload bytes, between 1 and [`MSG_MAX_DATA_LEN`] long
    pub data: &'a [u8],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Semantic category (mean) of a message.
///
/// Occupies the high nibble of the frame's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgMean {
    /// Remote controller report, remote -> chassis
    Remote = 0x00,

    /// Chassis link, chassis <-> main board
    Chassis = 0x01,
}

/// Encoding of a message payload.
///
/// Occupies the low nibble of the frame's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgDataType {
    U8 = 0x00,
    I8,
    U16,
    I16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
}

/// Result of a single call to [`MsgProtocol::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// Nothing was read, no channel is polled, or the cursor wrapped back to the start.
    NoData,

    /// A frame with a payload of the given length was consumed.
    ///
    /// If a callback is registered for the frame's mean it has already returned.
    Ok(usize),

    /// The frame's length byte is larger than [`MSG_MAX_DATA_LEN`], the frame was discarded.
    LengthOverflow,

    /// The length byte disagrees with the number of bytes received, the frame was discarded.
    LengthMismatch,

    /// The terminator byte was missing, the frame was discarded.
    VerifyError,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MsgMean {
    /// All means, in nibble order.
    pub const ALL: [MsgMean; 2] = [MsgMean::Remote, MsgMean::Chassis];

    /// Get the mean for a header nibble, or `None` if the nibble is out of range.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x00 => Some(MsgMean::Remote),
            0x01 => Some(MsgMean::Chassis),
            _ => None,
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

impl MsgDataType {
    /// Get the data type for a header nibble, or `None` if the nibble is out of range.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        use MsgDataType::*;

        match nibble {
            0x00 => Some(U8),
            0x01 => Some(I8),
            0x02 => Some(U16),
            0x03 => Some(I16),
            0x04 => Some(I32),
            0x05 => Some(U32),
            0x06 => Some(I64),
            0x07 => Some(U64),
            0x08 => Some(F32),
            0x09 => Some(F64),
            0x0A => Some(String),
            _ => None,
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }

    /// Size in bytes of one element of this type, or `None` for strings.
    pub fn elem_size(self) -> Option<usize> {
        use MsgDataType::*;

        match self {
            U8 | I8 => Some(1),
            U16 | I16 => Some(2),
            I32 | U32 | F32 => Some(4),
            I64 | U64 | F64 => Some(8),
            String => None,
        }
    }
}

impl PollResult {
    /// Single byte status code for this result.
    ///
    /// Lengths are returned as-is, errors use codes above the maximum payload length.
    pub fn code(&self) -> u8 {
        match self {
            PollResult::NoData => 0x00,
            PollResult::Ok(len) => *len as u8,
            PollResult::LengthOverflow => 0xFF,
            PollResult::LengthMismatch => 0xFE,
            PollResult::VerifyError => 0xFD,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PollResult::Ok(_))
    }
}
