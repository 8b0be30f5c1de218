//! Registration tables, sending and polling

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use log::{debug, trace, warn};

use super::{frame, MsgDataType, MsgMean, PollResult, RecvMsg, MSG_MAX_FRAME_LEN};
use crate::channel::{ChannelError, ChannelHandle, ChannelId};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Callback invoked on the polling thread for each valid frame of its mean.
pub type RecvCallback = Box<dyn FnMut(&RecvMsg<'_>) + Send>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The message protocol.
///
/// Owns the receive callback table and the set of polled channels, and shares the send table with
/// every [`MsgSender`] cloned from it. A single task owns the protocol and calls [`poll`] cyclicly,
/// other tasks send through a [`MsgSender`].
///
/// [`poll`]: MsgProtocol::poll
pub struct MsgProtocol {
    callbacks: HashMap<MsgMean, RecvCallback>,

    sender: MsgSender,

    /// Polled channels in the order they were added
    polled: Vec<ChannelHandle>,

    /// Ids of the channels in `polled`
    polled_ids: HashSet<ChannelId>,

    /// Index into `polled` of the next channel to read. Equal to `polled.len()` at the end of a
    /// pass.
    cursor: usize,
}

/// Cloneable handle for sending messages.
///
/// All senders cloned from the same protocol share its send table, so registering a channel
/// through one is visible to the others.
#[derive(Clone, Default)]
pub struct MsgSender {
    channels: Arc<RwLock<HashMap<MsgMean, ChannelHandle>>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MsgProtocol {
    /// Create a new protocol with nothing registered.
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
            sender: MsgSender::default(),
            polled: Vec::new(),
            polled_ids: HashSet::new(),
            cursor: 0,
        }
    }

    /// Register the callback for messages of the given mean, replacing any previous one.
    pub fn register_receive_callback<F>(&mut self, mean: MsgMean, callback: F)
    where
        F: FnMut(&RecvMsg<'_>) + Send + 'static,
    {
        if self.callbacks.insert(mean, Box::new(callback)).is_some() {
            debug!("Replaced receive callback for {:?}", mean);
        }
    }

    /// Register the channel messages of the given mean are sent through, replacing any previous
    /// one.
    pub fn register_send_channel(&self, mean: MsgMean, channel: ChannelHandle) {
        self.sender.register_channel(mean, channel)
    }

    /// Get a sender sharing this protocol's send table.
    pub fn sender(&self) -> MsgSender {
        self.sender.clone()
    }

    /// Send a message, see [`MsgSender::send`].
    pub fn send(&self, mean: MsgMean, data_type: MsgDataType, data: &[u8]) {
        self.sender.send(mean, data_type, data)
    }

    /// Add a channel to the polled set. Adding a channel that is already polled does nothing.
    pub fn add_polled_channel(&mut self, channel: ChannelHandle) {
        if self.polled_ids.insert(channel.id()) {
            self.polled.push(channel);
        }
    }

    /// Remove a channel from the polled set. Removing a channel that isn't polled does nothing.
    pub fn remove_polled_channel(&mut self, channel: &ChannelHandle) {
        if !self.polled_ids.remove(&channel.id()) {
            return;
        }

        if let Some(idx) = self.polled.iter().position(|c| c == channel) {
            self.polled.remove(idx);

            // Keep the cursor on the same next channel
            if idx < self.cursor {
                self.cursor -= 1;
            }
        }
    }

    /// Number of channels in the polled set.
    pub fn num_polled(&self) -> usize {
        self.polled.len()
    }

    /// Poll the next channel in the polled set.
    ///
    /// Reads at most one frame from one channel per call. After the last channel has been read
    /// the next call returns [`PollResult::NoData`] and the following one starts again from the
    /// first channel. If the frame is valid and a callback is registered for its mean, the
    /// callback is invoked before this function returns.
    ///
    /// Never blocks.
    pub fn poll(&mut self) -> PollResult {
        if self.cursor >= self.polled.len() {
            self.cursor = 0;
            return PollResult::NoData;
        }

        let channel = self.polled[self.cursor].clone();
        self.cursor += 1;

        let mut buf = [0u8; MSG_MAX_FRAME_LEN];
        let num_read = match channel.read_available(&mut buf) {
            Ok(n) => n,
            Err(ChannelError::Disconnected) => {
                warn!("Channel {} disconnected, no longer polled", channel.id());
                self.remove_polled_channel(&channel);
                return PollResult::NoData;
            }
            Err(e) => {
                warn!("Could not read from channel {}: {}", channel.id(), e);
                return PollResult::NoData;
            }
        };

        if num_read == 0 {
            return PollResult::NoData;
        }

        let msg = match frame::decode(&buf[..num_read]) {
            Ok(m) => m,
            Err(e) => {
                debug!("Discarded frame from channel {}: {}", channel.id(), e);
                return e.poll_result();
            }
        };

        trace!(
            "Received {:?} {:?} frame of {} bytes on channel {}",
            msg.mean,
            msg.data_type,
            msg.data.len(),
            channel.id()
        );

        if let Some(callback) = self.callbacks.get_mut(&msg.mean) {
            callback(&msg);
        }

        PollResult::Ok(msg.data.len())
    }
}

impl Default for MsgProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgSender {
    /// Register the channel messages of the given mean are sent through, replacing any previous
    /// one.
    pub fn register_channel(&self, mean: MsgMean, channel: ChannelHandle) {
        match self.channels.write() {
            Ok(mut c) => {
                c.insert(mean, channel);
            }
            Err(_) => warn!("Send table lock poisoned, {:?} channel not registered", mean),
        }
    }

    /// Send a message through the channel registered for its mean.
    ///
    /// Fire-and-forget: does nothing if the payload is empty or too long, or if no channel is
    /// registered for the mean. Write failures are logged.
    pub fn send(&self, mean: MsgMean, data_type: MsgDataType, data: &[u8]) {
        let frame = match frame::encode(mean, data_type, data) {
            Ok(f) => f,
            Err(e) => {
                trace!("Not sending {:?} message: {}", mean, e);
                return;
            }
        };

        let channel = match self.channels.read() {
            Ok(c) => match c.get(&mean) {
                Some(ch) => ch.clone(),
                None => {
                    trace!("No channel registered for {:?}, message dropped", mean);
                    return;
                }
            },
            Err(_) => {
                warn!("Send table lock poisoned, {:?} message dropped", mean);
                return;
            }
        };

        if let Err(e) = channel.write(&frame) {
            warn!("Could not send {:?} message on channel {}: {}", mean, channel.id(), e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::{Channel, MemChannel};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(MsgMean, MsgDataType, Vec<u8>)>>>;

    fn recorder(proto: &mut MsgProtocol, mean: MsgMean) -> Log {
        let log = Log::default();
        let log_cb = log.clone();
        proto.register_receive_callback(mean, move |msg| {
            log_cb
                .lock()
                .unwrap()
                .push((msg.mean, msg.data_type, msg.data.to_vec()))
        });
        log
    }

    #[test]
    fn test_send_and_poll() {
        let (local, remote) = MemChannel::pair();
        let local = ChannelHandle::new(local);
        let remote = ChannelHandle::new(remote);

        // Peer side sends, local side polls
        let mut peer = MsgProtocol::new();
        peer.register_send_channel(MsgMean::Chassis, remote.clone());

        let mut proto = MsgProtocol::new();
        proto.add_polled_channel(local.clone());
        let log = recorder(&mut proto, MsgMean::Chassis);

        peer.send(MsgMean::Chassis, MsgDataType::U8, &[8, 2]);

        assert_eq!(proto.poll(), PollResult::Ok(2));
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[(MsgMean::Chassis, MsgDataType::U8, vec![8, 2])]
        );

        // Wrap call, then nothing left to read
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.poll(), PollResult::NoData);

        // Messages with no callback are still consumed
        peer.sender().send(MsgMean::Chassis, MsgDataType::U8, &[1]);
        proto.register_receive_callback(MsgMean::Chassis, |_| ());
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.poll(), PollResult::Ok(1));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    /// Channel whose peer has gone away.
    struct ClosedChannel;

    impl Channel for ClosedChannel {
        fn read_available(&mut self, _buf: &mut [u8]) -> Result<usize, ChannelError> {
            Err(ChannelError::Disconnected)
        }

        fn write(&mut self, _data: &[u8]) -> Result<(), ChannelError> {
            Err(ChannelError::Disconnected)
        }
    }

    #[test]
    fn test_disconnected_channel_dropped() {
        let (open, peer) = MemChannel::pair();
        let open = ChannelHandle::new(open);
        let peer = ChannelHandle::new(peer);

        let mut proto = MsgProtocol::new();
        proto.add_polled_channel(ChannelHandle::new(ClosedChannel));
        proto.add_polled_channel(open);
        let log = recorder(&mut proto, MsgMean::Remote);

        let sender = MsgProtocol::new();
        sender.register_send_channel(MsgMean::Remote, peer);
        sender.send(MsgMean::Remote, MsgDataType::U8, &[0, 12, 12, 12, 12]);

        // Closed channel is removed and the open one is still read on the next call
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.num_polled(), 1);
        assert_eq!(proto.poll(), PollResult::Ok(5));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_send_no_ops() {
        let (a, mut b) = MemChannel::pair();
        let proto = MsgProtocol::new();

        // Nothing registered
        proto.send(MsgMean::Chassis, MsgDataType::U8, &[1]);

        proto.register_send_channel(MsgMean::Chassis, ChannelHandle::new(a));
        proto.send(MsgMean::Chassis, MsgDataType::U8, &[]);
        proto.send(
            MsgMean::Chassis,
            MsgDataType::U8,
            &[0u8; super::super::MSG_MAX_DATA_LEN + 1],
        );
        proto.send(MsgMean::Remote, MsgDataType::U8, &[1]);
        assert_eq!(b.pending(), 0);

        proto.send(MsgMean::Chassis, MsgDataType::U8, &[3]);
        let mut buf = [0u8; 8];
        assert_eq!(b.read_available(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[0x10, 0x01, 0x03, 0xFF]);
    }

    #[test]
    fn test_round_robin() {
        let (a_local, a_remote) = MemChannel::pair();
        let (b_local, b_remote) = MemChannel::pair();
        let a_remote = ChannelHandle::new(a_remote);
        let b_remote = ChannelHandle::new(b_remote);

        let mut proto = MsgProtocol::new();
        proto.add_polled_channel(ChannelHandle::new(a_local));
        proto.add_polled_channel(ChannelHandle::new(b_local));
        let log = recorder(&mut proto, MsgMean::Remote);

        a_remote.write(&[0x00, 0x01, 0xAA, 0xFF]).unwrap();
        a_remote.write(&[0x00, 0x01, 0xAB, 0xFF]).unwrap();
        b_remote.write(&[0x00, 0x01, 0xBB, 0xFF]).unwrap();

        assert_eq!(proto.poll(), PollResult::Ok(1));
        assert_eq!(proto.poll(), PollResult::Ok(1));
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.poll(), PollResult::Ok(1));
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.poll(), PollResult::NoData);

        let payloads: Vec<u8> = log.lock().unwrap().iter().map(|m| m.2[0]).collect();
        assert_eq!(payloads, vec![0xAA, 0xBB, 0xAB]);
    }

    #[test]
    fn test_polled_set() {
        let (a, _a_remote) = MemChannel::pair();
        let (b, _b_remote) = MemChannel::pair();
        let a = ChannelHandle::new(a);
        let b = ChannelHandle::new(b);

        let mut proto = MsgProtocol::new();
        assert_eq!(proto.poll(), PollResult::NoData);

        // Absent removal is a no-op
        proto.remove_polled_channel(&a);
        assert_eq!(proto.num_polled(), 0);

        // Duplicates are ignored
        proto.add_polled_channel(a.clone());
        proto.add_polled_channel(a.clone());
        assert_eq!(proto.num_polled(), 1);

        // Removing the only element empties the set
        proto.remove_polled_channel(&a);
        assert_eq!(proto.num_polled(), 0);
        assert_eq!(proto.poll(), PollResult::NoData);
        assert_eq!(proto.poll(), PollResult::NoData);

        // Removing the head keeps the rest
        proto.add_polled_channel(a.clone());
        proto.add_polled_channel(b.clone());
        proto.remove_polled_channel(&a);
        assert_eq!(proto.num_polled(), 1);
        proto.add_polled_channel(a.clone());
        assert_eq!(proto.num_polled(), 2);
    }

    #[test]
    fn test_removal_keeps_cursor() {
        let (a_local, _a_remote) = MemChannel::pair();
        let (b_local, b_remote) = MemChannel::pair();
        let a_local = ChannelHandle::new(a_local);
        let b_remote = ChannelHandle::new(b_remote);

        let mut proto = MsgProtocol::new();
        proto.add_polled_channel(a_local.clone());
        proto.add_polled_channel(ChannelHandle::new(b_local));

        // Read a, then drop it before b's turn
        assert_eq!(proto.poll(), PollResult::NoData);
        proto.remove_polled_channel(&a_local);

        b_remote.write(&[0x10, 0x01, 0x07, 0xFF]).unwrap();
        assert_eq!(proto.poll(), PollResult::Ok(1));
    }

    #[test]
    fn test_poll_rejects_malformed() {
        let (local, remote) = MemChannel::pair();
        let remote = ChannelHandle::new(remote);

        let mut proto = MsgProtocol::new();
        proto.add_polled_channel(ChannelHandle::new(local));
        let log = recorder(&mut proto, MsgMean::Chassis);

        let mut overflow = [0x10u8; MSG_MAX_FRAME_LEN];
        overflow[1] = 0xFF;
        remote.write(&overflow).unwrap();
        assert_eq!(proto.poll(), PollResult::LengthOverflow);
        assert_eq!(proto.poll(), PollResult::NoData);

        remote.write(&[0x10, 0x05, 1, 2, 0xFF]).unwrap();
        assert_eq!(proto.poll(), PollResult::LengthMismatch);
        assert_eq!(proto.poll(), PollResult::NoData);

        remote.write(&[0x10, 0x02, 1, 2, 0x00]).unwrap();
        assert_eq!(proto.poll(), PollResult::VerifyError);
        assert_eq!(proto.poll(), PollResult::NoData);

        // Out of range mean is dropped silently
        remote.write(&[0xF0, 0x01, 1, 0xFF]).unwrap();
        assert_eq!(proto.poll(), PollResult::NoData);

        assert!(log.lock().unwrap().is_empty());
    }
}
