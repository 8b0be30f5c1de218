//! TCP channel
//!
//! Stands in for a serial link when running on a host. A TCP stream does not preserve write
//! boundaries, so received bytes are split back into frame sized units using the frame's length
//! byte and terminator before being handed to the reader. Bytes which can't start a frame are
//! handed over on their own so the protocol can reject them without losing the frame after them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{self, Read, Write},
    net::TcpStream,
    time::Duration,
};

use log::{trace, warn};

use super::{Channel, ChannelError};
use crate::msg::{MSG_FRAME_OVERHEAD, MSG_MAX_DATA_LEN, MSG_MAX_FRAME_LEN, MSG_TERMINATOR};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const RX_CHUNK_LEN: usize = 256;

/// Most received bytes held waiting for the reader, the oldest are dropped past this.
const MAX_PENDING_LEN: usize = 8 * MSG_MAX_FRAME_LEN;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A channel over a TCP stream.
///
/// Reads never block. Writes block until the whole buffer is sent or the write timeout expires.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,

    /// Bytes received but not yet handed to the reader
    pending: Vec<u8>,

    /// Set once the peer closes its end
    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Whether a frame can start at a given offset of the received bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStart {
    /// A whole frame of this many bytes
    Complete(usize),

    /// Could be a frame once more bytes arrive
    Partial,

    /// Can't be a frame
    Invalid,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcpChannel {
    /// Connect to a peer at `endpoint` (`host:port`).
    pub fn connect(endpoint: &str, write_timeout: Duration) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(endpoint)
            .map_err(|e| ChannelError::ConnectError(endpoint.into(), e))?;

        Self::from_stream(stream, write_timeout)
    }

    /// Use an already connected stream, for instance one accepted from a listener.
    pub fn from_stream(stream: TcpStream, write_timeout: Duration) -> Result<Self, ChannelError> {
        stream
            .set_nodelay(true)
            .map_err(ChannelError::ConfigError)?;
        stream
            .set_write_timeout(Some(write_timeout))
            .map_err(ChannelError::ConfigError)?;
        stream
            .set_nonblocking(true)
            .map_err(ChannelError::ConfigError)?;

        Ok(Self {
            stream,
            pending: Vec::new(),
            closed: false,
        })
    }

    /// Move everything the socket has buffered into `pending`.
    fn drain_socket(&mut self) -> Result<(), ChannelError> {
        let mut chunk = [0u8; RX_CHUNK_LEN];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);

                    if self.pending.len() > MAX_PENDING_LEN {
                        let excess = self.pending.len() - MAX_PENDING_LEN;
                        warn!("TcpChannel reader is behind, dropping {} bytes", excess);
                        self.pending.drain(..excess);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChannelError::ReadError(e)),
            }
        }
    }

    /// What could start at `at` in `pending`.
    fn frame_at(&self, at: usize) -> FrameStart {
        let remaining = self.pending.len() - at;
        if remaining < 2 {
            return FrameStart::Partial;
        }

        let declared = self.pending[at + 1] as usize;
        if declared == 0 || declared > MSG_MAX_DATA_LEN {
            return FrameStart::Invalid;
        }

        let unit = declared + MSG_FRAME_OVERHEAD;
        if remaining < unit {
            FrameStart::Partial
        } else if self.pending[at + unit - 1] == MSG_TERMINATOR {
            FrameStart::Complete(unit)
        } else {
            FrameStart::Invalid
        }
    }

    /// Length of the next unit to hand to the reader, or `None` if more bytes are needed.
    ///
    /// A unit is either one complete frame or the run of bytes before the next frame.
    fn next_unit_len(&self) -> Option<usize> {
        let len = self.pending.len();
        if len == 0 {
            return None;
        }

        match self.frame_at(0) {
            FrameStart::Complete(unit) => return Some(unit),
            // A frame start waits for the rest of its bytes, at most one frame's worth
            FrameStart::Partial if !self.closed => return None,
            _ => (),
        }

        // A complete frame further on means everything before it is junk
        if let Some(next) = (1..len).find(|at| matches!(self.frame_at(*at), FrameStart::Complete(_)))
        {
            return Some(next);
        }

        if self.closed {
            Some(len)
        } else {
            // The last byte is always a possible start, so there is one to find
            (1..len).find(|at| self.frame_at(*at) == FrameStart::Partial)
        }
    }
}

impl Channel for TcpChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        if !self.closed {
            self.drain_socket()?;
        }

        let unit = match self.next_unit_len() {
            Some(u) => u,
            None if self.closed && self.pending.is_empty() => {
                return Err(ChannelError::Disconnected)
            }
            None => return Ok(0),
        };

        let num = unit.min(buf.len());
        buf[..num].copy_from_slice(&self.pending[..num]);
        self.pending.drain(..num);

        trace!("TcpChannel read {} bytes, {} pending", num, self.pending.len());

        Ok(num)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Disconnected);
        }

        // The write timeout only applies in blocking mode
        self.stream
            .set_nonblocking(false)
            .map_err(ChannelError::ConfigError)?;
        let res = self.stream.write_all(data);
        self.stream
            .set_nonblocking(true)
            .map_err(ChannelError::ConfigError)?;

        res.map_err(ChannelError::WriteError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg::{frame, MsgMean};
    use std::{
        net::TcpListener,
        time::{Duration, Instant},
    };

    fn read_unit(chan: &mut TcpChannel, buf: &mut [u8]) -> usize {
        let start = Instant::now();
        loop {
            let n = chan.read_available(buf).unwrap();
            if n > 0 || start.elapsed() > Duration::from_secs(2) {
                return n;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_tcp_channel_splits_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let mut client = TcpChannel::connect(&endpoint, Duration::from_millis(100)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        // Two frames in one write arrive as two units
        server
            .write_all(&[0x10, 0x01, 0x07, 0xFF, 0x00, 0x02, 0x01, 0x02, 0xFF])
            .unwrap();

        let mut buf = [0u8; 19];
        assert_eq!(read_unit(&mut client, &mut buf), 4);
        assert_eq!(&buf[..4], &[0x10, 0x01, 0x07, 0xFF]);
        assert_eq!(read_unit(&mut client, &mut buf), 5);
        assert_eq!(&buf[..5], &[0x00, 0x02, 0x01, 0x02, 0xFF]);

        // And the other direction
        client.write(&[0x11, 0x01, 0x03, 0xFF]).unwrap();
        let mut rx = [0u8; 4];
        server.read_exact(&mut rx).unwrap();
        assert_eq!(rx, [0x11, 0x01, 0x03, 0xFF]);
    }

    #[test]
    fn test_tcp_channel_implausible_length() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let mut client = TcpChannel::connect(&endpoint, Duration::from_millis(100)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        // Corrupt header directly followed by a valid frame
        server
            .write_all(&[0x10, 0xFF, 0x01, 0x02, 0x10, 0x01, 0x07, 0xFF])
            .unwrap();

        // Wait until all the bytes are in so the units are deterministic
        std::thread::sleep(Duration::from_millis(50));

        let mut buf = [0u8; 19];
        assert_eq!(read_unit(&mut client, &mut buf), 4);
        assert_eq!(&buf[..4], &[0x10, 0xFF, 0x01, 0x02]);
        assert!(frame::decode(&buf[..4]).is_err());

        assert_eq!(read_unit(&mut client, &mut buf), 4);
        let msg = frame::decode(&buf[..4]).unwrap();
        assert_eq!(msg.mean, MsgMean::Chassis);
        assert_eq!(msg.data, &[0x07]);
    }

    #[test]
    fn test_tcp_channel_pending_is_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let mut client = TcpChannel::connect(&endpoint, Duration::from_millis(100)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        // Far more frames than the reader takes in one go
        let frames: Vec<u8> = [0x10, 0x01, 0x07, 0xFF].repeat(300);
        server.write_all(&frames).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let mut buf = [0u8; 19];
        assert_eq!(read_unit(&mut client, &mut buf), 4);
        assert_eq!(&buf[..4], &[0x10, 0x01, 0x07, 0xFF]);
        assert!(client.pending.len() < MAX_PENDING_LEN);

        // The newest frames are kept
        let mut num_units = 1;
        while client.read_available(&mut buf).unwrap() > 0 {
            assert_eq!(&buf[..4], &[0x10, 0x01, 0x07, 0xFF]);
            num_units += 1;
        }
        assert_eq!(num_units, MAX_PENDING_LEN / 4);
    }
}
