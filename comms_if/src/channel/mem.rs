//! In-memory channel pair

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::{Channel, ChannelError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

type ChunkQueue = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// One end of an in-memory duplex link.
///
/// Each write is delivered to the other end as one read unit, the way an idle-line UART delivers
/// one burst per interrupt. If the reader's buffer is too small for a unit, the rest of it stays
/// queued for the next read.
#[derive(Debug)]
pub struct MemChannel {
    rx: ChunkQueue,
    tx: ChunkQueue,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MemChannel {
    /// Create two connected ends. Bytes written to one are read from the other.
    pub fn pair() -> (Self, Self) {
        let a_to_b = ChunkQueue::default();
        let b_to_a = ChunkQueue::default();

        (
            Self {
                rx: b_to_a.clone(),
                tx: a_to_b.clone(),
            },
            Self {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }

    /// Number of read units waiting at this end.
    pub fn pending(&self) -> usize {
        self.rx.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Channel for MemChannel {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let mut rx = self.rx.lock().map_err(|_| ChannelError::LockPoisoned)?;

        let chunk = match rx.pop_front() {
            Some(c) => c,
            None => return Ok(0),
        };

        let num = chunk.len().min(buf.len());
        buf[..num].copy_from_slice(&chunk[..num]);

        if num < chunk.len() {
            rx.push_front(chunk[num..].to_vec());
        }

        Ok(num)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        if data.is_empty() {
            return Ok(());
        }

        self.tx
            .lock()
            .map_err(|_| ChannelError::LockPoisoned)?
            .push_back(data.to_vec());

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mem_channel() {
        let (mut a, mut b) = MemChannel::pair();
        let mut buf = [0u8; 4];

        assert_eq!(a.read_available(&mut buf).unwrap(), 0);

        a.write(&[1, 2]).unwrap();
        a.write(&[3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(b.pending(), 2);
        assert_eq!(a.pending(), 0);

        // Units are not merged
        assert_eq!(b.read_available(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);

        // Truncated reads keep the remainder
        assert_eq!(b.read_available(&mut buf).unwrap(), 4);
        assert_eq!(&buf, &[3, 4, 5, 6]);
        assert_eq!(b.read_available(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[7, 8]);
        assert_eq!(b.read_available(&mut buf).unwrap(), 0);

        b.write(&[9]).unwrap();
        assert_eq!(a.read_available(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 9);
    }
}
