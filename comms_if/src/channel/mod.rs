//! # Channel Module
//!
//! Byte transports carrying message frames. A [`Channel`] is anything that can hand over the bytes
//! received since the last read without blocking, and write a buffer out.
//!
//! Channels are shared between the protocol's send table and its polled set through a
//! [`ChannelHandle`], which gives each channel a process-unique identity.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod mem;
mod tcp;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

pub use mem::MemChannel;
pub use tcp::TcpChannel;

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of channel handles created so far. Used to provide unique IDs for each handle.
static NUM_CHANNELS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A byte transport that frames are exchanged over.
pub trait Channel: Send {
    /// Copy the bytes received since the last call into `buf`, returning how many were copied.
    ///
    /// Must not block. Returns `Ok(0)` when nothing is available. A transport that delimits its
    /// input (such as an idle-line UART) returns at most one unit per call.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Write all of `data` out.
    fn write(&mut self, data: &[u8]) -> Result<(), ChannelError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Identity of a channel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(usize);

/// Shared handle to a channel.
///
/// Cloning a handle shares the same channel and keeps the same id. Handles compare equal when
/// they were cloned from the same original.
#[derive(Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    inner: Arc<Mutex<dyn Channel>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("Could not connect to {0}: {1}")]
    ConnectError(String, std::io::Error),

    #[error("Could not configure the channel: {0}")]
    ConfigError(std::io::Error),

    #[error("Could not read from the channel: {0}")]
    ReadError(std::io::Error),

    #[error("Could not write to the channel: {0}")]
    WriteError(std::io::Error),

    #[error("The channel's peer has disconnected")]
    Disconnected,

    #[error("The channel's lock was poisoned by a panicking thread")]
    LockPoisoned,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ChannelHandle {
    /// Wrap a channel in a new handle with a fresh id.
    pub fn new<C: Channel + 'static>(channel: C) -> Self {
        Self {
            id: ChannelId(NUM_CHANNELS.fetch_add(1, Ordering::Relaxed)),
            inner: Arc::new(Mutex::new(channel)),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Non-blocking read, see [`Channel::read_available`].
    pub fn read_available(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        match self.inner.lock() {
            Ok(mut c) => c.read_available(buf),
            Err(_) => Err(ChannelError::LockPoisoned),
        }
    }

    /// Write all of `data`, see [`Channel::write`].
    pub fn write(&self, data: &[u8]) -> Result<(), ChannelError> {
        match self.inner.lock() {
            Ok(mut c) => c.write(data),
            Err(_) => Err(ChannelError::LockPoisoned),
        }
    }
}

impl PartialEq for ChannelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChannelHandle {}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle").field("id", &self.id.0).finish()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_handle_identity() {
        let (a, b) = MemChannel::pair();
        let ha = ChannelHandle::new(a);
        let hb = ChannelHandle::new(b);

        assert_ne!(ha, hb);
        assert_eq!(ha, ha.clone());
        assert_eq!(ha.id(), ha.clone().id());

        // A clone shares the underlying channel
        ha.clone().write(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(hb.read_available(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
