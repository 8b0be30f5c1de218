//! # Frame encoding and decoding
//!
//! Pure functions converting between a message's parts and its wire representation. Decoding
//! never indexes past the bytes it was given, whatever the length byte claims.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use heapless::Vec as FrameVec;

use super::{
    MsgDataType, MsgMean, PollResult, RecvMsg, MSG_FRAME_OVERHEAD, MSG_MAX_DATA_LEN,
    MSG_MAX_FRAME_LEN, MSG_TERMINATOR,
};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Stack allocated buffer holding one encoded frame.
pub type FrameBuf = FrameVec<u8, MSG_MAX_FRAME_LEN>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Payload is empty")]
    EmptyPayload,

    #[error("Payload of {0} bytes exceeds the maximum payload length")]
    PayloadTooLong(usize),

    #[error("Declared length {0} exceeds the maximum payload length")]
    LengthOverflow(u8),

    #[error("Declared length {declared} does not match the {received} bytes received")]
    LengthMismatch { declared: usize, received: usize },

    #[error("Expected terminator 0xFF, found {0:#04X}")]
    MissingTerminator(u8),

    #[error("Unknown message mean nibble {0:#X}")]
    UnknownMean(u8),

    #[error("Unknown data type nibble {0:#X}")]
    UnknownDataType(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameError {
    /// The poll result reported when a received frame fails to decode with this error.
    pub fn poll_result(&self) -> PollResult {
        match self {
            FrameError::LengthOverflow(_) => PollResult::LengthOverflow,
            FrameError::LengthMismatch { .. } => PollResult::LengthMismatch,
            FrameError::MissingTerminator(_) => PollResult::VerifyError,
            // Unknown tags are dropped silently, as are the encode-only errors
            FrameError::Empty
            | FrameError::EmptyPayload
            | FrameError::PayloadTooLong(_)
            | FrameError::UnknownMean(_)
            | FrameError::UnknownDataType(_) => PollResult::NoData,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode a message into a frame.
///
/// The payload must be between 1 and [`MSG_MAX_DATA_LEN`] bytes long.
pub fn encode(mean: MsgMean, data_type: MsgDataType, data: &[u8]) -> Result<FrameBuf, FrameError> {
    if data.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    if data.len() > MSG_MAX_DATA_LEN {
        return Err(FrameError::PayloadTooLong(data.len()));
    }

    let mut frame = FrameBuf::new();

    // Capacity is MSG_MAX_FRAME_LEN and the payload length was checked above, so none of these
    // can fail.
    frame
        .push((mean.nibble() << 4) | data_type.nibble())
        .map_err(|_| FrameError::PayloadTooLong(data.len()))?;
    frame
        .push(data.len() as u8)
        .map_err(|_| FrameError::PayloadTooLong(data.len()))?;
    frame
        .extend_from_slice(data)
        .map_err(|_| FrameError::PayloadTooLong(data.len()))?;
    frame
        .push(MSG_TERMINATOR)
        .map_err(|_| FrameError::PayloadTooLong(data.len()))?;

    Ok(frame)
}

/// Decode a received frame.
///
/// `bytes` must be exactly the bytes received for one frame. The returned message borrows its
/// payload from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<RecvMsg<'_>, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::Empty);
    }

    // An out of range length byte is reported as such however much was received
    if let Some(&len_byte) = bytes.get(1) {
        if len_byte as usize > MSG_MAX_DATA_LEN {
            return Err(FrameError::LengthOverflow(len_byte));
        }
    }

    // A frame too short to carry a length byte, or declaring no payload, cannot match what was
    // received.
    if bytes.len() < MSG_FRAME_OVERHEAD || bytes[1] == 0 {
        return Err(FrameError::LengthMismatch {
            declared: bytes.get(1).copied().unwrap_or(0) as usize,
            received: bytes.len(),
        });
    }

    let declared = bytes[1] as usize;
    if declared + MSG_FRAME_OVERHEAD != bytes.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            received: bytes.len(),
        });
    }

    let terminator = bytes[declared + 2];
    if terminator != MSG_TERMINATOR {
        return Err(FrameError::MissingTerminator(terminator));
    }

    let mean = MsgMean::from_nibble(bytes[0] >> 4).ok_or(FrameError::UnknownMean(bytes[0] >> 4))?;
    let data_type = MsgDataType::from_nibble(bytes[0] & 0x0F)
        .ok_or(FrameError::UnknownDataType(bytes[0] & 0x0F))?;

    Ok(RecvMsg {
        mean,
        data_type,
        data: &bytes[2..2 + declared],
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode() {
        let frame = encode(MsgMean::Chassis, MsgDataType::U8, &[0x03]).unwrap();
        assert_eq!(&frame[..], &[0x10, 0x01, 0x03, 0xFF]);

        let frame = encode(MsgMean::Remote, MsgDataType::F32, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&frame[..], &[0x08, 0x04, 1, 2, 3, 4, 0xFF]);

        assert_eq!(
            encode(MsgMean::Chassis, MsgDataType::U8, &[]),
            Err(FrameError::EmptyPayload)
        );
        assert_eq!(
            encode(MsgMean::Chassis, MsgDataType::U8, &[0u8; MSG_MAX_DATA_LEN + 1]),
            Err(FrameError::PayloadTooLong(MSG_MAX_DATA_LEN + 1))
        );
    }

    #[test]
    fn test_decode_reproduces_encoded() {
        let payload: Vec<u8> = (0..MSG_MAX_DATA_LEN as u8).map(|b| b.wrapping_mul(37)).collect();

        for len in &[1, 2, MSG_MAX_DATA_LEN / 2, MSG_MAX_DATA_LEN] {
            let frame = encode(MsgMean::Chassis, MsgDataType::I16, &payload[..*len]).unwrap();
            assert_eq!(frame.len(), len + MSG_FRAME_OVERHEAD);

            let msg = decode(&frame).unwrap();
            assert_eq!(msg.mean, MsgMean::Chassis);
            assert_eq!(msg.data_type, MsgDataType::I16);
            assert_eq!(msg.data, &payload[..*len]);
        }
    }

    #[test]
    fn test_decode_length_errors() {
        assert_eq!(decode(&[]), Err(FrameError::Empty));

        // Length byte 255 never reads past what was received
        let mut bytes = [0u8; MSG_MAX_FRAME_LEN];
        bytes[0] = 0x10;
        bytes[1] = 0xFF;
        assert_eq!(decode(&bytes), Err(FrameError::LengthOverflow(0xFF)));
        assert_eq!(
            decode(&bytes).unwrap_err().poll_result(),
            PollResult::LengthOverflow
        );

        // Also when the overflowing length byte is all that came after the tag
        assert_eq!(decode(&[0x10, 0xFF]), Err(FrameError::LengthOverflow(0xFF)));
        assert_eq!(
            decode(&[0x10, 0x11, 0xFF]),
            Err(FrameError::LengthOverflow(0x11))
        );

        // Declares 4 bytes but only 2 arrived
        assert_eq!(
            decode(&[0x10, 0x04, 1, 2, 0xFF]),
            Err(FrameError::LengthMismatch {
                declared: 4,
                received: 5
            })
        );

        // Zero length and truncated frames
        assert_eq!(
            decode(&[0x10, 0x00, 0xFF]).unwrap_err().poll_result(),
            PollResult::LengthMismatch
        );
        assert_eq!(
            decode(&[0x10]).unwrap_err().poll_result(),
            PollResult::LengthMismatch
        );
    }

    #[test]
    fn test_decode_verify_and_tags() {
        assert_eq!(
            decode(&[0x10, 0x01, 0x03, 0xFE]),
            Err(FrameError::MissingTerminator(0xFE))
        );
        assert_eq!(
            decode(&[0x10, 0x01, 0x03, 0xFE]).unwrap_err().poll_result(),
            PollResult::VerifyError
        );

        assert_eq!(
            decode(&[0x20, 0x01, 0x03, 0xFF]),
            Err(FrameError::UnknownMean(2))
        );
        assert_eq!(
            decode(&[0x1B, 0x01, 0x03, 0xFF]),
            Err(FrameError::UnknownDataType(0x0B))
        );
        assert_eq!(
            decode(&[0x1B, 0x01, 0x03, 0xFF]).unwrap_err().poll_result(),
            PollResult::NoData
        );
    }
}
